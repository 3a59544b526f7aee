pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod scheduler;

pub use config::AppConfig;
pub use database::SqliteStore;
pub use error::{ConfigError, SchedulerError, StorageError};
pub use models::{Catalog, Grade, SchedulingRecord, Subject, Word, WordList};
pub use scheduler::Scheduler;
