//! Application operations shared by the HTTP server and the desktop client.
//!
//! Each function is one storage round trip (or a small fixed number of them)
//! wrapped around the Leitner scheduler. The current time always comes from the
//! passed [`Clock`].

use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::clock::{Clock, DayBounds};
use crate::database::db::{self, CardFilter};
use crate::error::{Error, Result};
use crate::models::leitner::{ReviewUpdate, apply_review};
use crate::models::stats::BoxCounts;
use crate::models::{
    CardBox, DueCards, Flashcard, LoginRequest, NewFlashcard, RegisterRequest, ReviewRequest,
    Stats, User,
};

/// The current time at the precision rows are stored with.
fn stored_now(clock: &dyn Clock) -> DateTime<Utc> {
    clock.now().trunc_subsecs(3)
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Validation(format!("{field} is required"))),
    }
}

/// Creates an account. The email must not be registered yet.
pub fn register(request: RegisterRequest, clock: &dyn Clock, conn: &Connection) -> Result<User> {
    let name = required("name", request.name)?.trim().to_string();
    let email = required("email", request.email)?.trim().to_string();
    let password = required("password", request.password)?;

    if db::find_user_by_email(&email, conn)?.is_some() {
        return Err(Error::EmailTaken);
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(&password)?,
        created: stored_now(clock),
    };
    db::insert_user(&user, conn)?;

    info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Checks credentials. Unknown email and wrong password are indistinguishable.
pub fn login(request: LoginRequest, conn: &Connection) -> Result<User> {
    let email = required("email", request.email)?;
    let password = required("password", request.password)?;

    let user = db::find_user_by_email(email.trim(), conn)?.ok_or(Error::InvalidCredentials)?;
    if !verify_password(&password, &user.password_hash)? {
        return Err(Error::InvalidCredentials);
    }

    info!(user_id = %user.id, "User logged in");
    Ok(user)
}

pub fn current_user(user_id: Uuid, conn: &Connection) -> Result<User> {
    db::find_user_by_id(user_id, conn)?.ok_or(Error::Unauthorized)
}

/// Creates a card in box 1 (or the requested box) due one interval from now.
pub fn create_flashcard(
    user_id: Uuid,
    request: NewFlashcard,
    clock: &dyn Clock,
    conn: &Connection,
) -> Result<Flashcard> {
    let question = required("question", request.question)?;
    let answer = required("answer", request.answer)?;
    let card_box = match request.card_box {
        Some(raw) => CardBox::new(raw)?,
        None => CardBox::default(),
    };

    let card = Flashcard::new(user_id, question, answer, card_box, stored_now(clock));
    db::insert_flashcard(&card, conn)?;

    debug!(user_id = %user_id, card_id = %card.id, card_box = %card.card_box, "Flashcard created");
    Ok(card)
}

pub fn list_flashcards(user_id: Uuid, conn: &Connection) -> Result<Vec<Flashcard>> {
    Ok(db::get_flashcards_for_user(user_id, conn)?)
}

fn box_counts(user_id: Uuid, conn: &Connection) -> Result<BoxCounts> {
    let mut counts = BoxCounts::default();
    for card_box in CardBox::all() {
        let filter = CardFilter {
            card_box: Some(card_box),
            ..Default::default()
        };
        counts[card_box.index()] = db::count_flashcards(user_id, &filter, conn)?;
    }
    Ok(counts)
}

fn due_by_end_of_day(user_id: Uuid, today: DayBounds, conn: &Connection) -> Result<u64> {
    let filter = CardFilter {
        due_by: Some(today.end),
        ..Default::default()
    };
    Ok(db::count_flashcards(user_id, &filter, conn)?)
}

/// Cards due now (lowest box first) with today's progress counters.
pub fn due_flashcards(
    user_id: Uuid,
    clock: &dyn Clock,
    day_offset: FixedOffset,
    conn: &Connection,
) -> Result<DueCards> {
    let now = clock.now();
    let today = DayBounds::containing(now, day_offset);

    Ok(DueCards {
        cards: db::get_flashcards_due_for_review(user_id, now, conn)?,
        due_today: due_by_end_of_day(user_id, today, conn)?,
        total: db::count_flashcards(user_id, &CardFilter::default(), conn)?,
        box_counts: box_counts(user_id, conn)?,
    })
}

/// Applies a review submission to one of the user's cards and stores it.
pub fn review_flashcard(
    user_id: Uuid,
    card_id: Uuid,
    request: ReviewRequest,
    clock: &dyn Clock,
    conn: &Connection,
) -> Result<Flashcard> {
    let update = request.into_update()?;
    let mut card = db::get_flashcard(user_id, card_id, conn)?.ok_or(Error::NotFound)?;

    let from_box = card.card_box;
    apply_review(&mut card, update, stored_now(clock));

    if !db::update_flashcard_schedule(&card, conn)? {
        return Err(Error::NotFound);
    }

    debug!(
        card_id = %card.id,
        from_box = %from_box,
        to_box = %card.card_box,
        overridden = matches!(update, ReviewUpdate::Override { .. }),
        "Flashcard reviewed"
    );
    Ok(card)
}

pub fn delete_flashcard(user_id: Uuid, card_id: Uuid, conn: &Connection) -> Result<()> {
    if db::delete_flashcard(user_id, card_id, conn)? {
        debug!(card_id = %card_id, "Flashcard deleted");
        Ok(())
    } else {
        Err(Error::NotFound)
    }
}

/// Per-box counts plus today's due and reviewed numbers.
pub fn stats(
    user_id: Uuid,
    clock: &dyn Clock,
    day_offset: FixedOffset,
    conn: &Connection,
) -> Result<Stats> {
    let today = DayBounds::containing(clock.now(), day_offset);
    let reviewed = CardFilter {
        reviewed_between: Some((today.start, today.end)),
        ..Default::default()
    };

    Ok(Stats {
        total_cards: db::count_flashcards(user_id, &CardFilter::default(), conn)?,
        box_counts: box_counts(user_id, conn)?,
        due_today: due_by_end_of_day(user_id, today, conn)?,
        reviewed_today: db::count_flashcards(user_id, &reviewed, conn)?,
    })
}
