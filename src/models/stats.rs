//! Aggregate views over a user's collection.
use serde::{Deserialize, Serialize};

use super::Flashcard;

/// Number of cards per box, index 0 is box 1.
pub type BoxCounts = [u64; 5];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_cards: u64,
    pub box_counts: BoxCounts,
    /// Cards due by the end of the current calendar day.
    pub due_today: u64,
    /// Cards whose last review falls within the current calendar day.
    pub reviewed_today: u64,
}

/// Cards due right now plus progress counters for the review screen.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCards {
    pub cards: Vec<Flashcard>,
    pub due_today: u64,
    pub total: u64,
    pub box_counts: BoxCounts,
}
