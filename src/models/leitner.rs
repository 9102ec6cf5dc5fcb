//! Leitner spaced repetition scheduling.
//!
//! Cards live in one of five boxes. A correct answer moves a card up one box
//! (box 5 is the ceiling), an incorrect answer sends it all the way back to
//! box 1. Each box has a fixed review interval:
//!
//! | box | interval |
//! |-----|----------|
//! | 1   | 1 day    |
//! | 2   | 3 days   |
//! | 3   | 7 days   |
//! | 4   | 14 days  |
//! | 5   | 30 days  |
//!
//! Everything here is pure: "now" is always passed in.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Flashcard;

/// Review interval in days, indexed by `box - 1`.
const INTERVAL_DAYS: [i64; 5] = [1, 3, 7, 14, 30];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("box must be between 1 and 5, got {0}")]
pub struct InvalidBox(pub i64);

/// A Leitner box number, always within 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct CardBox(u8);

impl CardBox {
    pub const FIRST: CardBox = CardBox(1);
    pub const LAST: CardBox = CardBox(5);

    pub fn new(value: i64) -> Result<Self, InvalidBox> {
        if (1..=5).contains(&value) {
            Ok(CardBox(value as u8))
        } else {
            Err(InvalidBox(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Position in 0-based per-box arrays such as `box_counts`.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn interval_days(self) -> i64 {
        INTERVAL_DAYS[self.index()]
    }

    pub fn interval(self) -> Duration {
        Duration::days(self.interval_days())
    }

    /// One box up, staying at the last box.
    pub fn promote(self) -> Self {
        CardBox(self.0.saturating_add(1).min(Self::LAST.0))
    }

    pub fn all() -> impl Iterator<Item = CardBox> {
        (Self::FIRST.0..=Self::LAST.0).map(CardBox)
    }
}

impl Default for CardBox {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<i64> for CardBox {
    type Error = InvalidBox;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        CardBox::new(value)
    }
}

impl From<CardBox> for u8 {
    fn from(card_box: CardBox) -> u8 {
        card_box.0
    }
}

impl fmt::Display for CardBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

impl From<bool> for Outcome {
    fn from(correct: bool) -> Self {
        if correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

/// New schedule position produced by a review.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub card_box: CardBox,
    pub next_review_date: DateTime<Utc>,
}

/// How a review submission changes a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewUpdate {
    /// Apply the Leitner rule to the card's current box.
    Outcome(Outcome),
    /// Set box and date directly, bypassing the rule.
    Override {
        card_box: CardBox,
        next_review_date: DateTime<Utc>,
    },
}

/// Schedule for a card entering `card_box` at `now`.
pub fn initial_schedule(card_box: CardBox, now: DateTime<Utc>) -> Transition {
    Transition {
        card_box,
        next_review_date: now + card_box.interval(),
    }
}

/// Calculates the box and next review date after answering a card.
pub fn next_review(current: CardBox, outcome: Outcome, now: DateTime<Utc>) -> Transition {
    let card_box = match outcome {
        Outcome::Correct => current.promote(),
        Outcome::Incorrect => CardBox::FIRST,
    };
    initial_schedule(card_box, now)
}

/// Applies a review submission to a card. `last_reviewed` is set to `now`
/// on both paths.
pub fn apply_review(card: &mut Flashcard, update: ReviewUpdate, now: DateTime<Utc>) {
    let transition = match update {
        ReviewUpdate::Outcome(outcome) => next_review(card.card_box, outcome, now),
        ReviewUpdate::Override {
            card_box,
            next_review_date,
        } => Transition {
            card_box,
            next_review_date,
        },
    };

    card.card_box = transition.card_box;
    card.next_review_date = transition.next_review_date;
    card.last_reviewed = Some(now);
}

pub fn is_due(card: &Flashcard, now: DateTime<Utc>) -> bool {
    card.next_review_date <= now
}

/// Presentation order for due cards: lower boxes first, then earliest date.
pub fn due_order(a: &Flashcard, b: &Flashcard) -> Ordering {
    a.card_box
        .cmp(&b.card_box)
        .then(a.next_review_date.cmp(&b.next_review_date))
}
