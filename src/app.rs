//! Desktop client UI and state management.
//! Sign in, manage cards, and run Leitner review sessions against the local
//! database.

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use eframe::egui;
use leitner_app::clock::{Clock, OffsetClock};
use leitner_app::database::db;
use leitner_app::export::json::{export_json_to_path, import_into, import_json};
use leitner_app::models::{
    CardBox, Flashcard, LoginRequest, NewFlashcard, RegisterRequest, ReviewSession, Stats, User,
};
use leitner_app::service;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Application screen states
#[derive(Default, PartialEq)]
enum AppScreen {
    #[default]
    SignIn,
    Main,
    ReviewSession,
}

#[derive(Default, Clone, Copy, PartialEq)]
enum AuthMode {
    #[default]
    Login,
    Register,
}

/// Main application state
pub struct MyApp {
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    conn: Arc<Mutex<Connection>>,
    clock: Arc<OffsetClock>,
    day_offset: FixedOffset,

    current_screen: AppScreen,
    user: Option<User>,

    auth_mode: AuthMode,
    auth_name: String,
    auth_email: String,
    auth_password: String,
    auth_error: Option<String>,

    cards: Vec<Flashcard>,
    stats: Stats,
    new_question: String,
    new_answer: String,
    new_box: u8,

    review_session: Option<ReviewSession>,

    show_stats: bool,
    show_result_dialog: bool,
    result_message: String,
}

/// Formats a timestamp as local YYYY-MM-DD
fn format_date(time: DateTime<Utc>) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d").to_string()
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::SignIn => self.render_sign_in_screen(ctx),
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::ReviewSession => self.render_review_screen(ctx),
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

        if self.show_stats {
            self.render_stats_window(ctx);
        }

        if self.show_result_dialog {
            egui::Window::new("Import/Export Result")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.result_message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_result_dialog = false;
                    }
                });
        }
    }
}

impl MyApp {
    /// Creates the application with the simulated day restored from the database
    pub fn new(conn: Connection) -> Self {
        let days = db::get_day_offset(&conn).unwrap_or_else(|e| {
            warn!("Could not read day offset: {e}");
            0
        });

        Self {
            show_confirmation_dialog: false,
            allowed_to_close: false,
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(OffsetClock::new(days)),
            day_offset: Local::now().offset().fix(),
            current_screen: AppScreen::SignIn,
            user: None,
            auth_mode: AuthMode::Login,
            auth_name: String::new(),
            auth_email: String::new(),
            auth_password: String::new(),
            auth_error: None,
            cards: Vec::new(),
            stats: Stats::default(),
            new_question: String::new(),
            new_answer: String::new(),
            new_box: 1,
            review_session: None,
            show_stats: false,
            show_result_dialog: false,
            result_message: String::new(),
        }
    }

    fn show_result(&mut self, message: String) {
        self.result_message = message;
        self.show_result_dialog = true;
    }

    /// Reloads the card list and counters for the signed-in user
    fn refresh(&mut self) {
        let Some(user_id) = self.user.as_ref().map(|u| u.id) else {
            return;
        };
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        match service::list_flashcards(user_id, &conn) {
            Ok(cards) => self.cards = cards,
            Err(e) => warn!("Failed to load flashcards: {e}"),
        }
        match service::stats(user_id, &*self.clock, self.day_offset, &conn) {
            Ok(stats) => self.stats = stats,
            Err(e) => warn!("Failed to load statistics: {e}"),
        }
    }

    /// Renders the sign in / register form
    fn render_sign_in_screen(&mut self, ctx: &egui::Context) {
        let mut submit = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Leitner Flashcards");
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.auth_mode, AuthMode::Login, "Sign in");
                ui.selectable_value(&mut self.auth_mode, AuthMode::Register, "Create account");
            });
            ui.separator();

            if self.auth_mode == AuthMode::Register {
                ui.horizontal(|ui| {
                    ui.label("Name:");
                    ui.text_edit_singleline(&mut self.auth_name);
                });
            }
            ui.horizontal(|ui| {
                ui.label("Email:");
                ui.text_edit_singleline(&mut self.auth_email);
            });
            ui.horizontal(|ui| {
                ui.label("Password:");
                ui.add(egui::TextEdit::singleline(&mut self.auth_password).password(true));
            });

            ui.add_space(10.0);
            let label = match self.auth_mode {
                AuthMode::Login => "Sign in",
                AuthMode::Register => "Register",
            };
            if ui.button(label).clicked() {
                submit = true;
            }

            if let Some(error) = &self.auth_error {
                ui.colored_label(egui::Color32::RED, error);
            }
        });

        if submit {
            self.submit_auth();
        }
    }

    fn submit_auth(&mut self) {
        let result = {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
            match self.auth_mode {
                AuthMode::Login => service::login(
                    LoginRequest {
                        email: Some(self.auth_email.clone()),
                        password: Some(self.auth_password.clone()),
                    },
                    &conn,
                ),
                AuthMode::Register => service::register(
                    RegisterRequest {
                        name: Some(self.auth_name.clone()),
                        email: Some(self.auth_email.clone()),
                        password: Some(self.auth_password.clone()),
                    },
                    &*self.clock,
                    &conn,
                ),
            }
        };

        match result {
            Ok(user) => {
                self.user = Some(user);
                self.auth_password.clear();
                self.auth_error = None;
                self.current_screen = AppScreen::Main;
                self.refresh();
            }
            Err(e) => self.auth_error = Some(e.to_string()),
        }
    }

    fn sign_out(&mut self) {
        self.user = None;
        self.cards.clear();
        self.stats = Stats::default();
        self.review_session = None;
        self.current_screen = AppScreen::SignIn;
    }

    /// Renders the main screen with card management interface
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        let Some(user) = self.user.clone() else {
            self.current_screen = AppScreen::SignIn;
            return;
        };

        // Deferred actions to avoid borrowing conflicts with the UI closures
        let mut action_next_day = false;
        let mut action_review = false;
        let mut action_add = false;
        let mut action_delete: Option<Flashcard> = None;
        let mut action_export = false;
        let mut action_import = false;
        let mut action_sign_out = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Signed in as {}", user.name));
                if ui.button("Sign out").clicked() {
                    action_sign_out = true;
                }
            });

            ui.horizontal(|ui| {
                ui.label(format_date(self.clock.now()));
                if ui.button("Next Day").clicked() {
                    action_next_day = true;
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                ui.label(format!(
                    "Due today: {}   Total: {}   Reviewed today: {}",
                    self.stats.due_today, self.stats.total_cards, self.stats.reviewed_today
                ));
                if ui.button("Statistics").clicked() {
                    self.show_stats = true;
                }
            });
            ui.horizontal(|ui| {
                for card_box in CardBox::all() {
                    ui.label(format!(
                        "Box {}: {}",
                        card_box,
                        self.stats.box_counts[card_box.index()]
                    ));
                }
            });

            if ui.button("Review due cards").clicked() {
                action_review = true;
            }
            ui.separator();

            // Import/Export buttons
            ui.horizontal(|ui| {
                if ui.button("Export Cards").clicked() {
                    action_export = true;
                }
                if ui.button("Import Cards").clicked() {
                    action_import = true;
                }
            });
            ui.separator();

            ui.heading("Add Flashcard");
            ui.horizontal(|ui| {
                ui.label("Question:");
                ui.text_edit_singleline(&mut self.new_question);
            });
            ui.horizontal(|ui| {
                ui.label("Answer:");
                ui.text_edit_singleline(&mut self.new_answer);
            });
            ui.horizontal(|ui| {
                ui.label("Start in box:");
                for b in 1..=5u8 {
                    ui.selectable_value(&mut self.new_box, b, b.to_string());
                }
            });
            if ui.button("Add Flashcard").clicked() {
                action_add = true;
            }
            ui.separator();

            ui.heading(format!("Flashcards ({})", self.cards.len()));
            egui::ScrollArea::vertical()
                .id_source("flashcards_list")
                .max_height(250.0)
                .show(ui, |ui| {
                    for (i, card) in self.cards.iter().enumerate() {
                        ui.group(|ui| {
                            ui.label(format!("{}. {}", i + 1, card.question));
                            ui.label(format!("   Answer: {}", card.answer));
                            ui.horizontal(|ui| {
                                ui.label(format!(
                                    "   Box {} · next review {}",
                                    card.card_box,
                                    format_date(card.next_review_date)
                                ));
                                if ui.button("Delete").clicked() {
                                    action_delete = Some(card.clone());
                                }
                            });
                        });
                    }
                });
        });

        // Execute deferred actions
        if action_sign_out {
            self.sign_out();
            return;
        }
        if action_next_day {
            self.advance_day();
        }
        if action_add {
            self.add_flashcard(user.id);
        }
        if let Some(card) = action_delete {
            self.delete_flashcard(&card);
        }
        if action_export {
            self.handle_export();
        }
        if action_import {
            self.handle_import(user.id);
        }
        if action_review {
            self.start_review_session(user.id);
        }
    }

    fn advance_day(&mut self) {
        let result = {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
            db::advance_day(&conn)
        };
        match result {
            Ok(days) => {
                self.clock.set_days(days);
                self.refresh();
            }
            Err(e) => warn!("Failed to advance day: {e}"),
        }
    }

    fn add_flashcard(&mut self, user_id: uuid::Uuid) {
        let request = NewFlashcard {
            question: Some(self.new_question.clone()),
            answer: Some(self.new_answer.clone()),
            card_box: Some(self.new_box as i64),
        };
        let result = {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
            service::create_flashcard(user_id, request, &*self.clock, &conn)
        };

        match result {
            Ok(_) => {
                self.new_question.clear();
                self.new_answer.clear();
                self.new_box = 1;
                self.refresh();
            }
            Err(e) => self.show_result(format!("Could not add flashcard: {e}")),
        }
    }

    fn delete_flashcard(&mut self, card: &Flashcard) {
        let result = {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
            service::delete_flashcard(card.user_id, card.id, &conn)
        };
        if let Err(e) = result {
            warn!("Failed to delete flashcard: {e}");
        }
        self.refresh();
    }

    /// Renders the review screen with the current due card
    fn render_review_screen(&mut self, ctx: &egui::Context) {
        let mut action_back = false;
        let mut action_answer: Option<bool> = None;
        let mut action_toggle = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &self.review_session else {
                action_back = true;
                return;
            };

            ui.heading("Review");
            ui.label(session.phase_message());
            ui.label(format!(
                "Reviewed: {} ({} correct, {} incorrect), {} remaining",
                session.reviewed_count(),
                session.correct_count,
                session.incorrect_count,
                session.remaining_count()
            ));
            ui.add_space(20.0);

            if session.is_completed() {
                ui.heading("All done!");
                ui.label("No more cards are due right now.");
                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    action_back = true;
                }
                return;
            }

            if let Some(card) = session.current_card() {
                ui.group(|ui| {
                    ui.set_min_height(200.0);
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(format!("Box {}", card.card_box));
                        ui.heading("Question:");
                        ui.label(&card.question);
                        ui.add_space(20.0);

                        if session.show_answer {
                            ui.heading("Answer:");
                            ui.label(&card.answer);
                        } else {
                            ui.label("(Click 'Show Answer' to reveal)");
                        }
                        ui.add_space(20.0);
                    });
                });
                ui.add_space(20.0);

                if !session.show_answer {
                    if ui.button("Show Answer").clicked() {
                        action_toggle = true;
                    }
                } else {
                    ui.label("Did you know it?");
                    ui.horizontal(|ui| {
                        if ui.button("Incorrect").clicked() {
                            action_answer = Some(false);
                        }
                        if ui.button("Correct").clicked() {
                            action_answer = Some(true);
                        }
                    });
                }
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action_back = true;
            }
        });

        // Execute deferred actions
        if let Some(session) = &mut self.review_session {
            if action_toggle {
                session.toggle_answer();
            }
            if let Some(correct) = action_answer {
                if let Err(e) = session.answer(correct) {
                    self.result_message = format!("Could not save review: {e}");
                    self.show_result_dialog = true;
                }
            }
        }
        if action_back {
            self.review_session = None;
            self.current_screen = AppScreen::Main;
            self.refresh();
        }
    }

    /// Starts a review session with the cards due now
    fn start_review_session(&mut self, user_id: uuid::Uuid) {
        let clock: Arc<dyn Clock> = self.clock.clone();
        match ReviewSession::start(user_id, Arc::clone(&self.conn), clock) {
            Ok(session) => {
                if session.is_completed() {
                    self.show_result("No cards are due for review.".to_string());
                } else {
                    self.review_session = Some(session);
                    self.current_screen = AppScreen::ReviewSession;
                }
            }
            Err(e) => self.show_result(format!("Could not start review: {e}")),
        }
    }

    fn render_stats_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_stats;
        egui::Window::new("Your Flashcard Statistics")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.label(format!("Progress today: {} flashcards due", self.stats.due_today));
                ui.label(format!("Reviewed today: {}", self.stats.reviewed_today));
                ui.label(format!("Total collection: {} flashcards", self.stats.total_cards));
                ui.separator();

                egui::Grid::new("leitner_boxes").striped(true).show(ui, |ui| {
                    ui.strong("Box");
                    ui.strong("Cards");
                    ui.strong("Review interval");
                    ui.end_row();

                    for card_box in CardBox::all() {
                        let days = card_box.interval_days();
                        ui.label(card_box.to_string());
                        ui.label(self.stats.box_counts[card_box.index()].to_string());
                        ui.label(format!("{} {}", days, if days == 1 { "day" } else { "days" }));
                        ui.end_row();
                    }
                });
            });
        self.show_stats = open;
    }

    /// Handles card export to a JSON file
    fn handle_export(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("flashcards.json")
            .add_filter("JSON files", &["json"])
            .save_file()
        {
            match export_json_to_path(&self.cards, &path) {
                Ok(_) => {
                    self.show_result(format!("Exported {} cards successfully!", self.cards.len()))
                }
                Err(e) => self.show_result(format!("Export failed: {e}")),
            }
        }
    }

    /// Handles card import from a JSON file
    fn handle_import(&mut self, user_id: uuid::Uuid) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };

        let collection = match import_json(&path) {
            Ok(collection) => collection,
            Err(e) => {
                self.show_result(format!(
                    "Import failed: {e}\n\nPlease check if the file has correct structure:\n{{\n  \"cards\": [{{ \"question\": \"...\", \"answer\": \"...\", \"box\": 1 }}]\n}}"
                ));
                return;
            }
        };

        let result = {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
            import_into(user_id, collection, &*self.clock, &conn)
        };
        match result {
            Ok(cards) => self.show_result(format!("Imported {} cards successfully!", cards.len())),
            Err(e) => self.show_result(format!("Import failed, no cards were added: {e}")),
        }
        self.refresh();
    }
}
