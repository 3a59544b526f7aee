mod app;

use app::ReviewDesk;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vocab_review::{AppConfig, Scheduler, SqliteStore, Word, WordList};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .init();

    info!("Vocab review desk v{} starting...", env!("CARGO_PKG_VERSION"));

    let store = SqliteStore::open(&config.database_path()?)?;

    if store.load_catalog()?.lists.is_empty() {
        let sample = WordList {
            name: "Polish Vocabulary".to_string(),
            words: vec![
                Word::new("cześć", "hello"),
                Word::new("dziękuję", "thank you"),
                Word::new("proszę", "please"),
            ],
            ..WordList::default()
        };
        store.add_word_list(&sample)?;
        info!("Sample word list created");
    }

    let scheduler = Arc::new(Scheduler::new(store).with_max_write_attempts(config.max_write_attempts));
    let learner_id = config.learner_id.clone();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([520.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Vocab Review",
        options,
        Box::new(move |_cc| Ok(Box::new(ReviewDesk::new(scheduler, learner_id)))),
    )?;
    Ok(())
}
