//! Review session for the desktop client.
//! Walks through the due cards one by one, applying the Leitner rule locally
//! before the store confirms it.

use super::leitner::{Outcome, next_review};
use super::{Flashcard, ReviewRequest};
use crate::clock::Clock;
use crate::database::db;
use crate::error::Result;
use crate::service;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// A pass over the cards that were due when the round started.
/// When a round is exhausted the due set is reloaded; the session is complete
/// once nothing is due.
pub struct ReviewSession {
    pub user_id: Uuid,
    pub cards: Vec<Flashcard>,
    pub current_index: usize,
    pub show_answer: bool,
    pub round_number: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl ReviewSession {
    /// Starts a session with the cards currently due for `user_id`.
    pub fn start(
        user_id: Uuid,
        conn: Arc<Mutex<Connection>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut session = Self {
            user_id,
            cards: Vec::new(),
            current_index: 0,
            show_answer: false,
            round_number: 0,
            correct_count: 0,
            incorrect_count: 0,
            conn,
            clock,
        };
        session.load_due_cards()?;
        Ok(session)
    }

    fn load_due_cards(&mut self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        self.cards = db::get_flashcards_due_for_review(self.user_id, self.clock.now(), &conn)?;
        self.current_index = 0;
        self.show_answer = false;
        self.round_number += 1;
        Ok(())
    }

    pub fn current_card(&self) -> Option<&Flashcard> {
        self.cards.get(self.current_index)
    }

    pub fn toggle_answer(&mut self) {
        self.show_answer = !self.show_answer;
    }

    /// Records an answer for the current card and moves on.
    ///
    /// The local copy is rescheduled immediately; if storing fails it is
    /// rolled back and the error returned, leaving the card current.
    pub fn answer(&mut self, correct: bool) -> Result<()> {
        let Some(card) = self.cards.get_mut(self.current_index) else {
            return Ok(());
        };

        let previous = card.clone();
        let now = self.clock.now();
        let transition = next_review(card.card_box, Outcome::from(correct), now);
        card.card_box = transition.card_box;
        card.next_review_date = transition.next_review_date;
        card.last_reviewed = Some(now);

        let stored = {
            let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
            service::review_flashcard(
                self.user_id,
                previous.id,
                ReviewRequest::answered(correct),
                self.clock.as_ref(),
                &conn,
            )
        };

        match stored {
            Ok(confirmed) => *card = confirmed,
            Err(e) => {
                warn!(card_id = %previous.id, error = %e, "Failed to store review");
                *card = previous;
                return Err(e);
            }
        }

        if correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        self.next_card()
    }

    fn next_card(&mut self) -> Result<()> {
        self.show_answer = false;
        if self.current_index + 1 < self.cards.len() {
            self.current_index += 1;
            Ok(())
        } else {
            self.load_due_cards()
        }
    }

    pub fn reviewed_count(&self) -> usize {
        self.correct_count + self.incorrect_count
    }

    pub fn remaining_count(&self) -> usize {
        self.cards.len().saturating_sub(self.current_index)
    }

    pub fn is_completed(&self) -> bool {
        self.current_card().is_none()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number <= 1 {
            format!("{} cards due", self.cards.len())
        } else {
            format!("Round {}: {} cards due again", self.round_number, self.cards.len())
        }
    }
}
