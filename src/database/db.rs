//! Database operations for the flashcard application
//!
//! Handles SQLite initialization, user accounts, owner-scoped flashcard CRUD,
//! filtered counts for statistics, and the desktop client's simulated day.
//!
//! Every flashcard query takes the owning user's id; there is no way to reach
//! another user's card through this module.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension, Result, Row, ToSql, params, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use crate::models::{CardBox, Flashcard, User};

/// Default location of the SQLite file.
pub const DEFAULT_DATABASE_PATH: &str = "db.sqlite3";

const FLASHCARD_COLUMNS: &str =
    "id, user_id, question, answer, box, next_review_date, created, last_reviewed";

impl ToSql for CardBox {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.get() as i64))
    }
}

impl FromSql for CardBox {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        CardBox::new(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(idx: usize, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn uuid_column(row: &Row, idx: usize) -> Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn flashcard_from_row(row: &Row) -> Result<Flashcard> {
    let last_reviewed = match row.get::<_, Option<i64>>(7)? {
        Some(millis) => Some(from_millis(7, millis)?),
        None => None,
    };

    Ok(Flashcard {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        card_box: row.get(4)?,
        next_review_date: from_millis(5, row.get(5)?)?,
        created: from_millis(6, row.get(6)?)?,
        last_reviewed,
    })
}

fn user_from_row(row: &Row) -> Result<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created: from_millis(4, row.get(4)?)?,
    })
}

/// Opens (or creates) the SQLite file at `path` and ensures the schema exists.
pub fn init_database(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    debug!(path, "Database initialized");
    Ok(conn)
}

/// In-memory database with the full schema, used by tests.
pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS flashcards (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            box INTEGER NOT NULL DEFAULT 1 CHECK (box BETWEEN 1 AND 5),
            next_review_date INTEGER NOT NULL,
            created INTEGER NOT NULL,
            last_reviewed INTEGER,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_flashcards_user_next_review
            ON flashcards (user_id, next_review_date);

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
}

// ==================== Users ====================

pub fn insert_user(user: &User, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, created) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.password_hash,
            to_millis(user.created)
        ],
    )?;
    Ok(())
}

pub fn find_user_by_email(email: &str, conn: &Connection) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, email, password_hash, created FROM users WHERE email = ?1",
        params![email],
        user_from_row,
    )
    .optional()
}

pub fn find_user_by_id(id: Uuid, conn: &Connection) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, email, password_hash, created FROM users WHERE id = ?1",
        params![id.to_string()],
        user_from_row,
    )
    .optional()
}

// ==================== Flashcards ====================

pub fn insert_flashcard(card: &Flashcard, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO flashcards (id, user_id, question, answer, box, next_review_date, created, last_reviewed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            card.id.to_string(),
            card.user_id.to_string(),
            card.question,
            card.answer,
            card.card_box,
            to_millis(card.next_review_date),
            to_millis(card.created),
            card.last_reviewed.map(to_millis),
        ],
    )?;
    Ok(())
}

/// Looks a card up by id, only if it belongs to `user_id`.
pub fn get_flashcard(user_id: Uuid, id: Uuid, conn: &Connection) -> Result<Option<Flashcard>> {
    conn.query_row(
        &format!("SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ?1 AND user_id = ?2"),
        params![id.to_string(), user_id.to_string()],
        flashcard_from_row,
    )
    .optional()
}

/// All cards of a user in creation order.
pub fn get_flashcards_for_user(user_id: Uuid, conn: &Connection) -> Result<Vec<Flashcard>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE user_id = ?1 ORDER BY created ASC, id ASC"
    ))?;

    let cards = stmt
        .query_map(params![user_id.to_string()], flashcard_from_row)?
        .collect::<Result<Vec<Flashcard>>>()?;

    Ok(cards)
}

/// Retrieves cards due for review at `now`
///
/// Returns cards where next_review_date <= now, lower boxes first and then
/// oldest due date first.
pub fn get_flashcards_due_for_review(
    user_id: Uuid,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<Flashcard>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FLASHCARD_COLUMNS} FROM flashcards
         WHERE user_id = ?1 AND next_review_date <= ?2
         ORDER BY box ASC, next_review_date ASC"
    ))?;

    let cards = stmt
        .query_map(params![user_id.to_string(), to_millis(now)], flashcard_from_row)?
        .collect::<Result<Vec<Flashcard>>>()?;

    Ok(cards)
}

/// Persists box, next review date and last review time of a card.
///
/// Returns false when the card does not exist under `card.user_id`.
pub fn update_flashcard_schedule(card: &Flashcard, conn: &Connection) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE flashcards
         SET box = ?1, next_review_date = ?2, last_reviewed = ?3
         WHERE id = ?4 AND user_id = ?5",
        params![
            card.card_box,
            to_millis(card.next_review_date),
            card.last_reviewed.map(to_millis),
            card.id.to_string(),
            card.user_id.to_string()
        ],
    )?;
    Ok(updated == 1)
}

/// Deletes a card. Returns false when nothing matched under the owner.
pub fn delete_flashcard(user_id: Uuid, id: Uuid, conn: &Connection) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM flashcards WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id.to_string()],
    )?;
    Ok(deleted == 1)
}

/// Optional conditions for [`count_flashcards`]. All set conditions must hold.
#[derive(Clone, Copy, Debug, Default)]
pub struct CardFilter {
    pub card_box: Option<CardBox>,
    /// next_review_date <= this instant
    pub due_by: Option<DateTime<Utc>>,
    /// last_reviewed within [start, end]
    pub reviewed_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

pub fn count_flashcards(user_id: Uuid, filter: &CardFilter, conn: &Connection) -> Result<u64> {
    let mut sql = String::from("SELECT COUNT(*) FROM flashcards WHERE user_id = ?");
    let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(card_box) = filter.card_box {
        sql.push_str(" AND box = ?");
        values.push(Box::new(card_box));
    }
    if let Some(due_by) = filter.due_by {
        sql.push_str(" AND next_review_date <= ?");
        values.push(Box::new(to_millis(due_by)));
    }
    if let Some((start, end)) = filter.reviewed_between {
        sql.push_str(" AND last_reviewed >= ? AND last_reviewed <= ?");
        values.push(Box::new(to_millis(start)));
        values.push(Box::new(to_millis(end)));
    }

    let count: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count as u64)
}

// ==================== App state ====================

/// Retrieves the desktop client's simulated day offset
pub fn get_day_offset(conn: &Connection) -> Result<i64> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM app_state WHERE key = 'day_offset'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Advances the simulated day by one and returns the new offset
pub fn advance_day(conn: &Connection) -> Result<i64> {
    let next = get_day_offset(conn)? + 1;
    conn.execute(
        "INSERT INTO app_state (key, value) VALUES ('day_offset', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![next.to_string()],
    )?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn add_user(email: &str, conn: &Connection) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: "Tester".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created: now(),
        };
        insert_user(&user, conn).unwrap();
        user
    }

    fn add_card(user: &User, card_box: i64, due: DateTime<Utc>, conn: &Connection) -> Flashcard {
        let mut card = Flashcard::new(
            user.id,
            format!("q{card_box}"),
            "a".to_string(),
            CardBox::new(card_box).unwrap(),
            now(),
        );
        card.next_review_date = due;
        insert_flashcard(&card, conn).unwrap();
        card
    }

    #[test]
    fn test_user_roundtrip() {
        let conn = init_in_memory().unwrap();
        let user = add_user("a@example.com", &conn);

        let by_email = find_user_by_email("a@example.com", &conn).unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.created, now());

        let by_id = find_user_by_id(user.id, &conn).unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");

        assert!(find_user_by_email("b@example.com", &conn).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let conn = init_in_memory().unwrap();
        add_user("a@example.com", &conn);

        let dup = User {
            id: Uuid::new_v4(),
            name: "Other".to_string(),
            email: "a@example.com".to_string(),
            password_hash: "hash".to_string(),
            created: now(),
        };
        assert!(insert_user(&dup, &conn).is_err());
    }

    #[test]
    fn test_flashcard_is_owner_scoped() {
        let conn = init_in_memory().unwrap();
        let owner = add_user("owner@example.com", &conn);
        let other = add_user("other@example.com", &conn);
        let card = add_card(&owner, 1, now(), &conn);

        assert_eq!(get_flashcard(owner.id, card.id, &conn).unwrap(), Some(card.clone()));
        assert!(get_flashcard(other.id, card.id, &conn).unwrap().is_none());
        assert!(!delete_flashcard(other.id, card.id, &conn).unwrap());

        let mut hijacked = card.clone();
        hijacked.user_id = other.id;
        hijacked.card_box = CardBox::LAST;
        assert!(!update_flashcard_schedule(&hijacked, &conn).unwrap());

        assert!(delete_flashcard(owner.id, card.id, &conn).unwrap());
        assert!(get_flashcard(owner.id, card.id, &conn).unwrap().is_none());
    }

    #[test]
    fn test_due_cards_ordering() {
        let conn = init_in_memory().unwrap();
        let user = add_user("a@example.com", &conn);

        let box2_early = add_card(&user, 2, now() - Duration::days(2), &conn);
        let box1_late = add_card(&user, 1, now() - Duration::days(1), &conn);
        let box1_early = add_card(&user, 1, now() - Duration::days(3), &conn);
        add_card(&user, 1, now() + Duration::hours(1), &conn);

        let due = get_flashcards_due_for_review(user.id, now(), &conn).unwrap();
        let ids: Vec<Uuid> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![box1_early.id, box1_late.id, box2_early.id]);
    }

    #[test]
    fn test_update_schedule_persists() {
        let conn = init_in_memory().unwrap();
        let user = add_user("a@example.com", &conn);
        let mut card = add_card(&user, 1, now(), &conn);

        card.card_box = CardBox::new(4).unwrap();
        card.next_review_date = now() + Duration::days(14);
        card.last_reviewed = Some(now());
        assert!(update_flashcard_schedule(&card, &conn).unwrap());

        let stored = get_flashcard(user.id, card.id, &conn).unwrap().unwrap();
        assert_eq!(stored, card);
    }

    #[test]
    fn test_count_with_filters() {
        let conn = init_in_memory().unwrap();
        let user = add_user("a@example.com", &conn);
        let other = add_user("b@example.com", &conn);

        add_card(&user, 1, now(), &conn);
        add_card(&user, 1, now() + Duration::days(1), &conn);
        let mut reviewed = add_card(&user, 3, now() + Duration::days(7), &conn);
        add_card(&other, 1, now(), &conn);

        reviewed.last_reviewed = Some(now());
        update_flashcard_schedule(&reviewed, &conn).unwrap();

        let all = count_flashcards(user.id, &CardFilter::default(), &conn).unwrap();
        assert_eq!(all, 3);

        let box1 = CardFilter {
            card_box: Some(CardBox::FIRST),
            ..Default::default()
        };
        assert_eq!(count_flashcards(user.id, &box1, &conn).unwrap(), 2);

        let due = CardFilter {
            due_by: Some(now()),
            ..Default::default()
        };
        assert_eq!(count_flashcards(user.id, &due, &conn).unwrap(), 1);

        let today = CardFilter {
            reviewed_between: Some((now() - Duration::hours(1), now() + Duration::hours(1))),
            ..Default::default()
        };
        assert_eq!(count_flashcards(user.id, &today, &conn).unwrap(), 1);
    }

    #[test]
    fn test_invalid_box_rejected_by_schema() {
        let conn = init_in_memory().unwrap();
        let user = add_user("a@example.com", &conn);
        let card = add_card(&user, 1, now(), &conn);

        let result = conn.execute(
            "UPDATE flashcards SET box = 9 WHERE id = ?1",
            params![card.id.to_string()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_advance_day() {
        let conn = init_in_memory().unwrap();
        assert_eq!(get_day_offset(&conn).unwrap(), 0);
        assert_eq!(advance_day(&conn).unwrap(), 1);
        assert_eq!(advance_day(&conn).unwrap(), 2);
        assert_eq!(get_day_offset(&conn).unwrap(), 2);
    }
}
