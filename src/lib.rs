pub mod auth;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod server;
pub mod service;

pub use error::{Error, Result};
pub use models::{CardBox, DueCards, Flashcard, ReviewSession, Stats, User};
