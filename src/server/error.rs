use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use crate::Error as ServiceError;
use crate::auth::TokenError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid or expired token")]
    Token(#[from] TokenError),

    #[error("{}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error("Background task failed: {0}")]
    Task(#[from] JoinError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Service(ServiceError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Service(ServiceError::Validation(_) | ServiceError::EmailTaken)
            | AppError::Body(_) => StatusCode::BAD_REQUEST,
            AppError::Service(ServiceError::InvalidCredentials | ServiceError::Unauthorized)
            | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Service(_) | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
