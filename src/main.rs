mod app;
use leitner_app::*;

use app::MyApp;
use database::db::{DEFAULT_DATABASE_PATH, init_database};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> eframe::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_path: String = config::try_load("DATABASE_PATH", DEFAULT_DATABASE_PATH)
        .expect("Failed to read DATABASE_PATH");
    let conn = init_database(&database_path).expect("Failed to initialize database");
    info!("Using database {database_path}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([520.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Leitner Flashcards",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(conn)))),
    )
}
