//! Review desk UI.
//! Catalog management, starting practice and reviewing the due queue.

use chrono::{DateTime, Utc};
use eframe::egui;
use std::sync::Arc;
use tracing::{error, warn};
use vocab_review::export::json::{export_progress_to_path, export_word_list_to_path, import_word_list};
use vocab_review::models::{Catalog, Grade, ReviewSession, Subject, WordList};
use vocab_review::{Scheduler, SqliteStore};

/// Application screen states
#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Review,
}

/// Main application state
pub struct ReviewDesk {
    scheduler: Arc<Scheduler<SqliteStore>>,
    learner_id: String,
    catalog: Catalog,
    selected_list_index: Option<usize>,
    current_term: String,
    current_definition: String,
    new_list_name: String,

    current_screen: AppScreen,
    session: Option<ReviewSession>,
    today: Option<DateTime<Utc>>,
    due_count: usize,

    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    status_message: Option<String>,
}

impl eframe::App for ReviewDesk {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Review => self.render_review_screen(ctx),
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        let mut dismiss = false;
        if let Some(message) = &self.status_message {
            egui::Window::new("Review Desk")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        dismiss = true;
                    }
                });
        }
        if dismiss {
            self.status_message = None;
        }
    }
}

impl ReviewDesk {
    pub fn new(scheduler: Arc<Scheduler<SqliteStore>>, learner_id: String) -> Self {
        let mut desk = Self {
            scheduler,
            learner_id,
            catalog: Catalog::default(),
            selected_list_index: None,
            current_term: String::new(),
            current_definition: String::new(),
            new_list_name: String::new(),
            current_screen: AppScreen::Main,
            session: None,
            today: None,
            due_count: 0,
            show_confirmation_dialog: false,
            allowed_to_close: false,
            status_message: None,
        };
        desk.refresh();
        if !desk.catalog.lists.is_empty() {
            desk.selected_list_index = Some(0);
        }
        desk
    }

    /// Reloads the catalog, the simulated date and the due counter
    fn refresh(&mut self) {
        match self.scheduler.store().load_catalog() {
            Ok(catalog) => self.catalog = catalog,
            Err(e) => self.report(format!("Failed to load word lists: {e}")),
        }
        match self.scheduler.store().current_date() {
            Ok(today) => self.today = Some(today),
            Err(e) => self.report(format!("Failed to read the current date: {e}")),
        }
        if let Some(today) = self.today {
            match self.scheduler.get_due(&self.learner_id, today) {
                Ok(due) => self.due_count = due.len(),
                Err(e) => self.report(format!("Failed to query due reviews: {e}")),
            }
        }
    }

    fn report(&mut self, message: String) {
        warn!("{message}");
        self.status_message = Some(message);
    }

    /// Renders the main screen with catalog management
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let date = self
                    .today
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                ui.label(format!("{date}  ·  learner: {}", self.learner_id));

                if ui.button("Next Day").clicked() {
                    if let Err(e) = self.scheduler.store().advance_day() {
                        self.report(format!("Failed to advance the date: {e}"));
                    }
                    self.refresh();
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button(format!("Review due ({})", self.due_count)).clicked() {
                    self.start_review_session();
                }
                if ui.button("Import Word List").clicked() {
                    self.handle_import();
                }
                if ui.button("Export Progress").clicked() {
                    self.handle_export();
                }
            });

            ui.separator();

            ui.heading("Create New Word List");
            ui.horizontal(|ui| {
                ui.label("List name:");
                ui.text_edit_singleline(&mut self.new_list_name);
                if ui.button("Create List").clicked() && !self.new_list_name.trim().is_empty() {
                    let name = self.new_list_name.trim().to_string();
                    if let Err(e) = self.scheduler.store().new_word_list(&name) {
                        self.report(format!("Failed to create '{name}': {e}"));
                    }
                    self.new_list_name.clear();
                    self.refresh();
                }
            });

            ui.separator();

            ui.heading(format!("Word Lists ({})", self.catalog.lists.len()));

            // Actions run after rendering to avoid borrowing conflicts
            let mut action_select: Option<usize> = None;
            let mut action_practice: Option<Subject> = None;
            let mut action_deactivate_list: Option<i64> = None;

            egui::ScrollArea::vertical()
                .id_source("lists")
                .max_height(150.0)
                .show(ui, |ui| {
                    for (i, list) in self.catalog.lists.iter().enumerate() {
                        let is_selected = self.selected_list_index == Some(i);
                        ui.horizontal(|ui| {
                            let mut label =
                                format!("{}. {} ({} words)", i + 1, list.name, list.active_words().count());
                            if !list.is_active {
                                label.push_str(" [deleted]");
                            }
                            if ui.selectable_label(is_selected, label).clicked() {
                                action_select = Some(i);
                            }
                            if list.is_active {
                                if ui.button("Practice list").clicked() {
                                    action_practice = Some(Subject::WordList(list.id));
                                }
                                if ui.button("Delete").clicked() {
                                    action_deactivate_list = Some(list.id);
                                }
                            }
                        });
                    }
                });

            if let Some(i) = action_select {
                self.selected_list_index = Some(i);
            }

            ui.separator();

            let mut action_add_word: Option<String> = None;
            let mut action_deactivate_word: Option<i64> = None;
            let mut action_export_list: Option<WordList> = None;

            if let Some(list) = self
                .selected_list_index
                .and_then(|i| self.catalog.lists.get(i))
                .filter(|list| list.is_active)
            {
                ui.heading(format!("Selected List: {}", list.name));

                ui.horizontal(|ui| {
                    ui.label("Term:");
                    ui.text_edit_singleline(&mut self.current_term);
                });
                ui.horizontal(|ui| {
                    ui.label("Definition:");
                    ui.text_edit_singleline(&mut self.current_definition);
                });
                ui.horizontal(|ui| {
                    if ui.button("Add Word").clicked()
                        && !self.current_term.is_empty()
                        && !self.current_definition.is_empty()
                    {
                        action_add_word = Some(list.name.clone());
                    }
                    if ui.button("Export List").clicked() {
                        action_export_list = Some(list.active_only());
                    }
                });

                ui.separator();

                egui::ScrollArea::vertical()
                    .id_source("words")
                    .max_height(220.0)
                    .show(ui, |ui| {
                        for word in list.active_words() {
                            ui.group(|ui| {
                                ui.horizontal(|ui| {
                                    ui.label(format!("{} = {}", word.term, word.definition));
                                    if ui.button("Practice").clicked() {
                                        action_practice = Some(Subject::Word(word.id));
                                    }
                                    if ui.button("Delete").clicked() {
                                        action_deactivate_word = Some(word.id);
                                    }
                                });
                            });
                        }
                    });
            } else {
                ui.label("Select a word list to add words");
            }

            if let Some(list_name) = action_add_word {
                let added = self.scheduler.store().add_word(
                    &list_name,
                    &self.current_term,
                    &self.current_definition,
                );
                if let Err(e) = added {
                    self.report(format!("Failed to add '{}': {e}", self.current_term));
                }
                self.current_term.clear();
                self.current_definition.clear();
                self.refresh();
            }
            if let Some(list) = action_export_list {
                self.handle_export_list(&list);
            }
            if let Some(id) = action_deactivate_word {
                if let Err(e) = self.scheduler.store().deactivate_word(id) {
                    self.report(format!("Failed to delete word: {e}"));
                }
                self.refresh();
            }
            if let Some(id) = action_deactivate_list {
                if let Err(e) = self.scheduler.store().deactivate_word_list(id) {
                    self.report(format!("Failed to delete list: {e}"));
                }
                self.refresh();
            }
            if let Some(subject) = action_practice {
                self.start_practicing(subject);
            }
        });
    }

    /// Renders the review screen for the current session
    fn render_review_screen(&mut self, ctx: &egui::Context) {
        let mut action_toggle = false;
        let mut action_grade: Option<Grade> = None;
        let mut action_back = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &self.session else {
                action_back = true;
                return;
            };

            ui.heading(format!("Reviewing as {}", session.learner_id));
            ui.label(session.phase_message());
            ui.label(format!(
                "Progress: {} / {} passed ({} remaining)",
                session.passed_count(),
                session.total_count(),
                session.remaining_count()
            ));
            ui.add_space(20.0);

            if let Some(item) = session.current_item() {
                ui.group(|ui| {
                    ui.set_min_height(200.0);
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.heading(&item.prompt);
                        ui.add_space(20.0);
                        if session.show_answer {
                            ui.label(&item.answer);
                        } else {
                            ui.label("(Click 'Show Answer' to reveal)");
                        }
                        ui.add_space(20.0);
                    });
                });

                ui.add_space(20.0);

                if session.show_answer {
                    ui.label("How well did you recall it?");
                    ui.horizontal(|ui| {
                        for grade in Grade::ALL {
                            if ui.button(grade.as_str()).clicked() {
                                action_grade = Some(grade);
                            }
                        }
                    });
                } else if ui.button("Show Answer").clicked() {
                    action_toggle = true;
                }
            } else {
                ui.heading("All done!");
                ui.label("Nothing else is due today.");
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action_back = true;
            }
        });

        if action_toggle {
            if let Some(session) = &mut self.session {
                session.toggle_answer();
            }
        }
        if let Some(grade) = action_grade {
            self.grade_current(grade);
        }
        if action_back {
            self.current_screen = AppScreen::Main;
            self.session = None;
            self.refresh();
        }
    }

    fn start_practicing(&mut self, subject: Subject) {
        match self.scheduler.start_practicing(&self.learner_id, subject) {
            Ok(_) => {
                let label = self
                    .catalog
                    .prompt_for(subject)
                    .map(|(prompt, _)| prompt)
                    .unwrap_or_else(|| subject.to_string());
                self.status_message = Some(format!("Started practicing {label}"));
            }
            Err(e) => self.report(format!("Could not start practicing: {e}")),
        }
        self.refresh();
    }

    /// Starts a session over everything due today, most overdue first
    fn start_review_session(&mut self) {
        let Some(today) = self.today else {
            return;
        };
        match self.scheduler.get_due(&self.learner_id, today) {
            Ok(due) if due.is_empty() => {
                self.status_message = Some("Nothing is due for review today.".to_string());
            }
            Ok(due) => {
                self.session = Some(ReviewSession::from_due(&self.learner_id, &due, &self.catalog));
                self.current_screen = AppScreen::Review;
            }
            Err(e) => self.report(format!("Failed to query due reviews: {e}")),
        }
    }

    fn grade_current(&mut self, grade: Grade) {
        let (Some(session), Some(today)) = (&mut self.session, self.today) else {
            return;
        };
        if let Err(e) = session.grade_current(self.scheduler.as_ref(), grade, today) {
            error!("Failed to record review: {e}");
            self.status_message = Some(format!("Failed to record review: {e}"));
        }
    }

    /// Imports a word list from a JSON file chosen by the user
    fn handle_import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };

        let result = import_word_list(&path).and_then(|list| {
            self.scheduler.store().add_word_list(&list)?;
            Ok(list)
        });
        match result {
            Ok(list) => {
                self.status_message = Some(format!(
                    "Word list '{}' imported with {} words!",
                    list.name,
                    list.words.len()
                ));
            }
            Err(e) => self.report(format!(
                "Import failed: {e}\n\nExpected structure:\n{{\n  \"name\": \"List Name\",\n  \"words\": [{{\"term\": \"...\", \"definition\": \"...\"}}]\n}}"
            )),
        }
        self.refresh();
    }

    /// Exports a word list to a JSON file chosen by the user
    fn handle_export_list(&mut self, list: &WordList) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(format!("{}.json", list.name))
            .add_filter("JSON files", &["json"])
            .save_file()
        else {
            return;
        };

        match export_word_list_to_path(list, &path) {
            Ok(()) => {
                self.status_message = Some(format!("Exported '{}' ({} words).", list.name, list.words.len()))
            }
            Err(e) => self.report(format!("Export failed: {e}")),
        }
    }

    /// Exports the learner's scheduling records to a JSON file
    fn handle_export(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(format!("{}-progress.json", self.learner_id))
            .add_filter("JSON files", &["json"])
            .save_file()
        else {
            return;
        };

        let exported_at = self.today.unwrap_or_else(Utc::now);
        let result = self
            .scheduler
            .records_for(&self.learner_id)
            .map_err(|e| e.to_string())
            .and_then(|records| {
                export_progress_to_path(&self.learner_id, &records, exported_at, &path)
                    .map(|_| records.len())
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(count) => self.status_message = Some(format!("Exported {count} scheduling records.")),
            Err(e) => self.report(format!("Export failed: {e}")),
        }
    }
}
