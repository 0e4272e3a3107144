//! HTTP API.
//!
//! # Endpoints
//!
//! - `POST /api/bet`                          – place a bet
//! - `GET  /api/bet/{correlation_id}/status`  – poll a bet's resolution

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gacha_core::entities::ValidationError;
use gacha_core::processors::{SubmissionError, SubmitError};
use gacha_core::store::StoreError;
use gacha_sdk::objects::ErrorResponse;

use crate::state::AppState;

pub mod bet;
pub mod extractors;

/// Build the API router, nested under `/api`.
pub fn router() -> Router<AppState> {
    Router::new().merge(bet::router())
}

/// Errors that can occur in API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad client input; the reason is returned to the caller.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The ledger did not accept the bet.
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    /// The event store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(e) => ApiError::Validation(e),
            SubmitError::Submission(e) => ApiError::Submission(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Submission(e) => {
                tracing::error!(error = %e, "Bet submission failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Event store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
