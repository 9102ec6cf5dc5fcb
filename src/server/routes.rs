//! HTTP handlers. Each one takes the connection lock for the duration of a
//! single service call. Calls that hash passwords run on the blocking pool.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::error::AppError;
use super::extract::{ApiJson, AuthUser};
use super::state::SharedState;
use crate::auth::issue_token;
use crate::error::Error;
use crate::models::{
    DueCards, Flashcard, LoginRequest, NewFlashcard, PublicUser, RegisterRequest, ReviewRequest,
    Stats,
};
use crate::service;

#[derive(Serialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Path ids that are not UUIDs cannot name any card.
fn parse_card_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound.into())
}

/// Runs `f` with the connection on the blocking pool.
async fn with_blocking_conn<T, F>(state: &SharedState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Connection) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = state.conn.blocking_lock();
        f(&conn)
    })
    .await?;
    Ok(result?)
}

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        service: "leitner-flashcards".to_string(),
        status: "healthy".to_string(),
    })
}

pub async fn register_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let clock = state.clock.clone();
    let user = with_blocking_conn(&state, move |conn| {
        service::register(payload, clock.as_ref(), conn)
    })
    .await?;
    let token = issue_token(
        user.id,
        &state.config.token_secret,
        state.config.register_token_ttl,
        state.clock.now(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn login_handler(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = with_blocking_conn(&state, move |conn| service::login(payload, conn)).await?;
    let token = issue_token(
        user.id,
        &state.config.token_secret,
        state.config.login_token_ttl,
        state.clock.now(),
    )?;

    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

pub async fn me_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let conn = state.conn.lock().await;
    let user = service::current_user(auth.user_id, &conn)?;
    Ok(Json(PublicUser::from(&user)))
}

/// Tokens are stateless; logging out only leaves a trace in the logs.
pub async fn logout_handler(auth: AuthUser) -> impl IntoResponse {
    info!(user_id = %auth.user_id, "User logged out");
    Json(json!({ "message": "Logged out successfully" }))
}

pub async fn create_flashcard_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<NewFlashcard>,
) -> Result<impl IntoResponse, AppError> {
    let conn = state.conn.lock().await;
    let card = service::create_flashcard(auth.user_id, payload, state.clock.as_ref(), &conn)?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn list_flashcards_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Vec<Flashcard>>, AppError> {
    let conn = state.conn.lock().await;
    Ok(Json(service::list_flashcards(auth.user_id, &conn)?))
}

pub async fn due_flashcards_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<DueCards>, AppError> {
    let conn = state.conn.lock().await;
    let due = service::due_flashcards(
        auth.user_id,
        state.clock.as_ref(),
        state.config.day_offset,
        &conn,
    )?;
    Ok(Json(due))
}

pub async fn review_flashcard_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReviewRequest>,
) -> Result<Json<Flashcard>, AppError> {
    let card_id = parse_card_id(&id)?;
    let conn = state.conn.lock().await;
    let card = service::review_flashcard(
        auth.user_id,
        card_id,
        payload,
        state.clock.as_ref(),
        &conn,
    )?;
    Ok(Json(card))
}

pub async fn delete_flashcard_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let card_id = parse_card_id(&id)?;
    let conn = state.conn.lock().await;
    service::delete_flashcard(auth.user_id, card_id, &conn)?;
    Ok(Json(json!({ "message": "Flashcard deleted successfully" })))
}

pub async fn stats_handler(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Stats>, AppError> {
    let conn = state.conn.lock().await;
    let stats = service::stats(
        auth.user_id,
        state.clock.as_ref(),
        state.config.day_offset,
        &conn,
    )?;
    Ok(Json(stats))
}
