//! JSON API for the flashcard web frontend.
//!
//! | route | handler |
//! |-------|---------|
//! | `POST /auth/register`, `POST /auth/login` | account creation and sign in, both return a bearer token |
//! | `GET /auth/me`, `POST /auth/logout` | current user / stateless logout |
//! | `GET/POST /flashcards` | list and create cards |
//! | `GET /flashcards/due` | due cards with progress counters |
//! | `PUT/DELETE /flashcards/{id}` | review submission and deletion |
//! | `GET /stats` | per-box and daily counters |
//!
//! When `STATIC_DIR` is set the built frontend is served for every other path.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post, put},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::database::db::init_database;
use routes::{
    create_flashcard_handler, delete_flashcard_handler, due_flashcards_handler, health_handler,
    list_flashcards_handler, login_handler, logout_handler, me_handler, register_handler,
    review_flashcard_handler, stats_handler,
};
pub use state::{SharedState, State};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid origin {origin}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

/// Builds the full application router around `state`.
pub fn create_router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/healthz", get(health_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/auth/logout", post(logout_handler))
        .route(
            "/flashcards",
            get(list_flashcards_handler).post(create_flashcard_handler),
        )
        .route("/flashcards/due", get(due_flashcards_handler))
        .route(
            "/flashcards/{id}",
            put(review_flashcard_handler).delete(delete_flashcard_handler),
        )
        .route("/stats", get(stats_handler));

    if let Some(dir) = &state.config.static_dir {
        info!("Serving frontend from {}", dir.display());
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> crate::Result<()> {
    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Opening database at {}", config.database_path);
    let conn = init_database(&config.database_path)?;

    let address = format!("0.0.0.0:{}", config.port);
    let state = State::new(config, conn, Arc::new(SystemClock));
    let app = create_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
