//! Flashcard is a question/answer pair owned by one user, together with its
//! position in the Leitner schedule.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::leitner::{CardBox, initial_schedule};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub answer: String,
    #[serde(rename = "box")]
    pub card_box: CardBox,
    pub next_review_date: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// A fresh card in `card_box`, due one interval from `now`.
    pub fn new(
        user_id: Uuid,
        question: String,
        answer: String,
        card_box: CardBox,
        now: DateTime<Utc>,
    ) -> Self {
        let schedule = initial_schedule(card_box, now);
        Self {
            id: Uuid::new_v4(),
            user_id,
            question,
            answer,
            card_box: schedule.card_box,
            next_review_date: schedule.next_review_date,
            created: now,
            last_reviewed: None,
        }
    }
}

/// Body of a create request. Fields are optional so missing ones surface as
/// validation errors rather than deserialization failures.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
    pub question: Option<String>,
    pub answer: Option<String>,
    #[serde(rename = "box")]
    pub card_box: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_flashcard_creation() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let owner = Uuid::new_v4();
        let card = Flashcard::new(
            owner,
            "cześć".to_string(),
            "hello".to_string(),
            CardBox::default(),
            now,
        );

        assert_eq!(card.user_id, owner);
        assert_eq!(card.card_box, CardBox::FIRST);
        assert_eq!(card.next_review_date, now + Duration::days(1));
        assert_eq!(card.created, now);
        assert!(card.last_reviewed.is_none());
    }

    #[test]
    fn test_flashcard_json_shape() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let card = Flashcard::new(
            Uuid::nil(),
            "proszę".to_string(),
            "please".to_string(),
            CardBox::new(3).unwrap(),
            now,
        );

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["box"], 3);
        assert_eq!(value["question"], "proszę");
        assert!(value.get("nextReviewDate").is_some());
        assert!(value.get("userId").is_some());
        assert!(value["lastReviewed"].is_null());
    }

    #[test]
    fn test_new_flashcard_accepts_partial_body() {
        let body: NewFlashcard = serde_json::from_str(r#"{"question": "dziękuję"}"#).unwrap();
        assert_eq!(body.question.as_deref(), Some("dziękuję"));
        assert!(body.answer.is_none());
        assert!(body.card_box.is_none());
    }
}
