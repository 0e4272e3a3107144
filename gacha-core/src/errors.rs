//! Startup failures that must stop the process before it serves traffic.

use crate::ledger::GatewayError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    /// The event store could not be opened or is malformed.
    #[error("event store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The resolution subscription could not be established.
    #[error("resolution subscription failed: {0}")]
    Subscription(#[source] GatewayError),
}
