use super::{CorrelationId, WeiAmount};
use crate::events::ResolutionEvent;
use gacha_sdk::objects::BetStatusResponse;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome of one bet, as persisted in the event store.
///
/// A record exists only once the bet is resolved. There is deliberately no
/// status field: a bet without a record is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRecord {
    pub correlation_id: CorrelationId,
    /// Address of the player.
    pub subject: String,
    /// `true` if the bet was won.
    pub outcome: bool,
    /// Payout in wei.
    pub amount: WeiAmount,
    /// Local time at which the resolution was reconciled, not the block time.
    #[serde(with = "time::serde::rfc3339")]
    pub resolved_at: OffsetDateTime,
}

impl ResolutionRecord {
    pub fn from_event(event: ResolutionEvent, resolved_at: OffsetDateTime) -> Self {
        Self {
            correlation_id: event.correlation_id,
            subject: event.subject,
            outcome: event.outcome,
            amount: event.amount,
            resolved_at,
        }
    }
}

/// Result of a status lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetStatus {
    Pending(CorrelationId),
    Resolved(ResolutionRecord),
}

impl From<BetStatus> for BetStatusResponse {
    fn from(value: BetStatus) -> Self {
        match value {
            BetStatus::Pending(id) => BetStatusResponse::Pending {
                correlation_id: id.into(),
            },
            BetStatus::Resolved(record) => BetStatusResponse::Resolved {
                correlation_id: record.correlation_id.into(),
                subject: record.subject,
                outcome: record.outcome,
                amount: record.amount.into(),
                resolved_at: record.resolved_at,
            },
        }
    }
}
