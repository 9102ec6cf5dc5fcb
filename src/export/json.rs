//! JSON import/export of a user's flashcards.
//! Only the content and box travel; schedules are rebuilt on import.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{CardBox, Flashcard, NewFlashcard};
use crate::service;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportedCard {
    pub question: String,
    pub answer: String,
    #[serde(rename = "box", default)]
    pub card_box: CardBox,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardCollection {
    pub cards: Vec<ExportedCard>,
}

impl From<&[Flashcard]> for CardCollection {
    fn from(cards: &[Flashcard]) -> Self {
        Self {
            cards: cards
                .iter()
                .map(|card| ExportedCard {
                    question: card.question.clone(),
                    answer: card.answer.clone(),
                    card_box: card.card_box,
                })
                .collect(),
        }
    }
}

/// Exports cards to a pretty-printed JSON file at `path`.
pub fn export_json_to_path(cards: &[Flashcard], path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(&CardCollection::from(cards))?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    info!(count = cards.len(), path = %path.display(), "Cards exported");
    Ok(())
}

/// Reads a card collection from a JSON file.
/// Boxes outside 1..=5 make the whole file invalid.
pub fn import_json(path: &Path) -> Result<CardCollection> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let collection: CardCollection = serde_json::from_str(&contents)?;
    Ok(collection)
}

/// Creates every card of `collection` for `user_id`, scheduled from now.
/// All or nothing: if any card fails validation or storage, none are kept.
pub fn import_into(
    user_id: Uuid,
    collection: CardCollection,
    clock: &dyn Clock,
    conn: &Connection,
) -> Result<Vec<Flashcard>> {
    let tx = conn.unchecked_transaction()?;
    let imported = collection
        .cards
        .into_iter()
        .map(|card| {
            service::create_flashcard(
                user_id,
                NewFlashcard {
                    question: Some(card.question),
                    answer: Some(card.answer),
                    card_box: Some(card.card_box.get() as i64),
                },
                clock,
                &tx,
            )
        })
        .collect::<Result<Vec<Flashcard>>>()?;
    tx.commit()?;

    info!(user_id = %user_id, count = imported.len(), "Cards imported");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::db;
    use crate::models::RegisterRequest;
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use tempfile::tempdir;

    fn create_test_cards() -> Vec<Flashcard> {
        let now = Utc.with_ymd_and_hms(2024, 4, 4, 12, 0, 0).unwrap();
        vec![
            Flashcard::new(
                Uuid::nil(),
                "hello".to_string(),
                "cześć".to_string(),
                CardBox::FIRST,
                now,
            ),
            Flashcard::new(
                Uuid::nil(),
                "goodbye".to_string(),
                "do widzenia".to_string(),
                CardBox::new(4).unwrap(),
                now,
            ),
        ]
    }

    #[test]
    fn test_export_writes_boxes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cards.json");

        export_json_to_path(&create_test_cards(), &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["cards"][1]["question"], "goodbye");
        assert_eq!(written["cards"][1]["box"], 4);
        assert!(written["cards"][0].get("nextReviewDate").is_none());
    }

    #[test]
    fn test_import_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("import.json");
        fs::write(
            &path,
            r#"{
  "cards": [
    { "question": "test term", "answer": "test definition" },
    { "question": "second", "answer": "drugi", "box": 3 }
  ]
}"#,
        )
        .unwrap();

        let collection = import_json(&path).unwrap();
        assert_eq!(collection.cards.len(), 2);
        assert_eq!(collection.cards[0].card_box, CardBox::FIRST);
        assert_eq!(collection.cards[1].card_box.get(), 3);
    }

    #[test]
    fn test_import_rejects_bad_box() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"cards": [{"question": "q", "answer": "a", "box": 8}]}"#).unwrap();

        assert!(import_json(&path).is_err());
    }

    #[test]
    fn test_import_nonexistent_file() {
        assert!(import_json(Path::new("nonexistent_file_xyz123.json")).is_err());
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(import_json(&path).is_err());
    }

    #[test]
    fn test_import_into_reschedules() {
        let conn = db::init_in_memory().unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap());
        let user = service::register(
            RegisterRequest {
                name: Some("Jan".to_string()),
                email: Some("jan@example.com".to_string()),
                password: Some("pw".to_string()),
            },
            &clock,
            &conn,
        )
        .unwrap();

        let collection = CardCollection::from(create_test_cards().as_slice());
        let imported = import_into(user.id, collection, &clock, &conn).unwrap();

        assert_eq!(imported.len(), 2);
        assert!(imported.iter().all(|c| c.user_id == user.id));
        assert_eq!(imported[1].next_review_date, clock.now() + Duration::days(14));
        assert_eq!(service::list_flashcards(user.id, &conn).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_import_keeps_nothing() {
        let conn = db::init_in_memory().unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap());
        let user = service::register(
            RegisterRequest {
                name: Some("Ewa".to_string()),
                email: Some("ewa@example.com".to_string()),
                password: Some("pw".to_string()),
            },
            &clock,
            &conn,
        )
        .unwrap();

        let collection: CardCollection = serde_json::from_str(
            r#"{"cards": [{"question": "ok", "answer": "a"}, {"question": "", "answer": "b"}]}"#,
        )
        .unwrap();

        assert!(import_into(user.id, collection, &clock, &conn).is_err());
        assert!(service::list_flashcards(user.id, &conn).unwrap().is_empty());

        // The connection is still usable after the rollback
        let retry = CardCollection::from(create_test_cards().as_slice());
        assert_eq!(import_into(user.id, retry, &clock, &conn).unwrap().len(), 2);
    }
}
