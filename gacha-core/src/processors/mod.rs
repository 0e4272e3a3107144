//! Processors for the bet lifecycle.
//!
//! - `BetSubmitter`: validates a `PlaceBet`, sends it to the ledger and
//!   returns the correlation id
//! - `ResolutionListener`: drains `ResolutionEvent`s and records them in the
//!   `EventStore`

pub mod bet_submission;
pub mod resolution_listener;

pub use bet_submission::{
    BetSubmitter, DEFAULT_SUBMIT_TIMEOUT, PlaceBet, PlacedBet, SubmissionError, SubmitError,
};
pub use resolution_listener::{ListenerHandle, ListenerState, ResolutionListener};
