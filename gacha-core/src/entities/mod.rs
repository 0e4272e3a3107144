//! Domain types shared by the store, the ledger gateway and the processors.

pub mod amount;
pub mod bet;
pub mod correlation_id;
pub mod resolution_record;

pub use amount::WeiAmount;
pub use bet::Multiplier;
pub use correlation_id::CorrelationId;
pub use resolution_record::{BetStatus, ResolutionRecord};

use thiserror::Error;

/// Bad client input. Never retried; always reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("multiplier must be between {min} and {max}, got {got}")]
    MultiplierOutOfRange { got: i64, min: u8, max: u8 },

    #[error("invalid amount {0:?}: must be a positive decimal ether string like \"0.1\"")]
    InvalidAmount(String),

    #[error("amount {0:?} has more than 18 decimal places")]
    TooPrecise(String),

    #[error("amount {0:?} is too large")]
    TooLarge(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid request body: {0}")]
    MalformedBody(String),
}
