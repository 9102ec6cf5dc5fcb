//! Request extractors: bearer token authentication and JSON bodies that
//! reject with the API's error shape.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::{header::AUTHORIZATION, request::Parts};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::error::AppError;
use super::state::SharedState;
use crate::auth::verify_token;
use crate::database::db;
use crate::error::Error;

/// The authenticated caller. Rejects with 401 when the `Authorization` header
/// is missing, the token does not verify, or its user no longer exists.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(Error::Unauthorized)?;

        let claims = verify_token(token, &state.config.token_secret, state.clock.now())?;

        let conn = state.conn.lock().await;
        if db::find_user_by_id(claims.user_id, &conn)
            .map_err(Error::from)?
            .is_none()
        {
            return Err(Error::Unauthorized.into());
        }

        Ok(AuthUser {
            user_id: claims.user_id,
        })
    }
}

/// `Json` whose rejection is an [`AppError`], so malformed bodies get the
/// same 400 `{"message"}` response as failed validation.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}
