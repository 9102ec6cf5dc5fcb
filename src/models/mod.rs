pub mod flashcard;
pub mod leitner;
pub mod review;
pub mod review_session;
pub mod stats;
pub mod user;

pub use flashcard::{Flashcard, NewFlashcard};
pub use leitner::{CardBox, Outcome, ReviewUpdate};
pub use review::ReviewRequest;
pub use review_session::ReviewSession;
pub use stats::{DueCards, Stats};
pub use user::{LoginRequest, PublicUser, RegisterRequest, User};
