//! Event type definitions.

use crate::entities::{CorrelationId, WeiAmount};

/// A bet's outcome became known on the ledger.
///
/// Mirrors the contract's `BetResolved(requestId, player, won, payout)` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionEvent {
    pub correlation_id: CorrelationId,
    /// Address of the player.
    pub subject: String,
    pub outcome: bool,
    /// Payout in wei; zero for a lost bet.
    pub amount: WeiAmount,
}
