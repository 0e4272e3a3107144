//! Request and response bodies of the bet API.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/bet`.
///
/// `amount` is a decimal ether string such as `"0.1"`. It is kept as a string
/// so no precision is lost on the way to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub multiplier: u8,
    pub amount: String,
}

/// Response returned once the bet transaction is mined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetResponse {
    pub correlation_id: String,
}

/// Response of `GET /api/bet/{correlation_id}/status`.
///
/// A bet has no stored state until it is resolved, so `Pending` only echoes
/// the identifier back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BetStatusResponse {
    #[serde(rename_all = "camelCase")]
    Pending { correlation_id: String },
    #[serde(rename_all = "camelCase")]
    Resolved {
        correlation_id: String,
        /// Address of the player that placed the bet.
        subject: String,
        /// Whether the bet was won.
        outcome: bool,
        /// Payout in wei, as a decimal digit string.
        amount: String,
        #[serde(with = "time::serde::rfc3339")]
        resolved_at: time::OffsetDateTime,
    },
}

impl BetStatusResponse {
    pub fn correlation_id(&self) -> &str {
        match self {
            BetStatusResponse::Pending { correlation_id } => correlation_id,
            BetStatusResponse::Resolved { correlation_id, .. } => correlation_id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, BetStatusResponse::Resolved { .. })
    }
}

/// Error payload returned with every 4xx and 5xx response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
