//! Custom Axum extractors.
//!
//! Provides `BetBody`, which parses the `POST /api/bet` body into a
//! [`PlaceBet`] and reports malformed input as a validation error instead
//! of axum's plain-text JSON rejection.

use axum::extract::{FromRequest, Request};
use gacha_core::entities::ValidationError;
use gacha_core::processors::PlaceBet;
use serde_json::{Map, Value};

use super::ApiError;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// The body of a bet request.
///
/// ```text
/// { "multiplier": 3, "amount": "0.1" }
/// ```
///
/// `betAmount` is accepted in place of `amount`.
pub struct BetBody(pub PlaceBet);

impl<S: Send + Sync> FromRequest<S> for BetBody {
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let body_bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| malformed("failed to read request body"))?;

        let value: Value = serde_json::from_slice(&body_bytes)
            .map_err(|e| malformed(&format!("invalid JSON: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(malformed("expected a JSON object").into());
        };

        Ok(BetBody(PlaceBet {
            multiplier: multiplier(&fields)?,
            amount: amount(&fields)?,
        }))
    }
}

fn multiplier(fields: &Map<String, Value>) -> Result<i64, ValidationError> {
    match fields.get("multiplier") {
        None | Some(Value::Null) => Err(ValidationError::MissingField("multiplier")),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| malformed("multiplier must be an integer")),
    }
}

fn amount(fields: &Map<String, Value>) -> Result<String, ValidationError> {
    let value = fields
        .get("amount")
        .filter(|v| !v.is_null())
        .or_else(|| fields.get("betAmount").filter(|v| !v.is_null()));
    match value {
        None => Err(ValidationError::MissingField("amount")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(malformed("amount must be a decimal string")),
    }
}

fn malformed(reason: &str) -> ValidationError {
    ValidationError::MalformedBody(reason.to_string())
}
