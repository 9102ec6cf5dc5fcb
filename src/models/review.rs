//! Review submission body and its validation into a [`ReviewUpdate`].

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::leitner::{CardBox, Outcome, ReviewUpdate};
use crate::error::{Error, Result};

/// Either `{correct}` or `{box, nextReviewDate}`. When both override fields are
/// present they win over `correct`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub card_box: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<DateTime<Utc>>,
}

impl ReviewRequest {
    pub fn answered(correct: bool) -> Self {
        Self {
            correct: Some(correct),
            ..Default::default()
        }
    }

    /// Override dates are cut to milliseconds, the precision they are stored at.
    pub fn into_update(self) -> Result<ReviewUpdate> {
        match (self.card_box, self.next_review_date, self.correct) {
            (Some(card_box), Some(next_review_date), _) => Ok(ReviewUpdate::Override {
                card_box: CardBox::new(card_box)?,
                next_review_date: next_review_date.trunc_subsecs(3),
            }),
            (Some(_), None, _) | (None, Some(_), _) => Err(Error::Validation(
                "box and nextReviewDate must be supplied together".to_string(),
            )),
            (None, None, Some(correct)) => Ok(ReviewUpdate::Outcome(Outcome::from(correct))),
            (None, None, None) => Err(Error::Validation(
                "either correct or box and nextReviewDate is required".to_string(),
            )),
        }
    }
}
