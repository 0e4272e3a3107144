//! Ledger gateway: the seam between the coordinator and the external ledger.
//!
//! The ledger itself (contract execution, VRF fulfilment) is a black box. The
//! gateway exposes the four things the coordinator needs from it: send a bet
//! transaction and read its receipt, subscribe to resolution events, and force
//! a resolution where no live oracle exists.
//!
//! Two implementations are provided:
//!
//! - [`SimulatedLedger`]: an in-process stand-in for the game contract and
//!   the VRF coordinator mock.
//! - [`JsonRpcLedger`]: an EVM JSON-RPC client for a node running the
//!   deployed contracts.

pub mod abi;
pub mod cursor;
pub mod json_rpc;
pub mod simulated;

pub use cursor::{BlockCursor, CursorError};
pub use json_rpc::{Deployment, DeploymentError, JsonRpcLedger, JsonRpcLedgerConfig};
pub use simulated::SimulatedLedger;

use crate::entities::{CorrelationId, Multiplier, WeiAmount};
use crate::events::{ResolutionEvent, ResolutionSender};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that can occur while talking to the ledger.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure talking to the node.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The transaction was mined but reverted, or the call was rejected.
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },

    /// The transaction was sent but no receipt appeared in time.
    #[error("no receipt for transaction {tx_hash} after waiting")]
    ReceiptTimeout { tx_hash: String },

    /// The node answered with something that could not be decoded.
    #[error("malformed ledger response: {0}")]
    Malformed(String),

    /// No account is available to sign transactions.
    #[error("no sender account available on the node")]
    NoAccount,

    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// A decoded log entry from a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLog {
    /// The game contract accepted a bet and requested randomness for it.
    BetPlaced {
        correlation_id: CorrelationId,
        player: String,
    },
    /// The game contract resolved a bet.
    BetResolved(ResolutionEvent),
    /// Any log the coordinator does not care about.
    Other {
        address: String,
        topic: Option<String>,
    },
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub logs: Vec<LedgerLog>,
}

impl TransactionReceipt {
    /// The correlation id from the first `BetPlaced` log, if any.
    pub fn bet_placed_id(&self) -> Option<&CorrelationId> {
        self.logs.iter().find_map(|log| match log {
            LedgerLog::BetPlaced { correlation_id, .. } => Some(correlation_id),
            _ => None,
        })
    }
}

/// Trait for ledger gateway implementations.
///
/// Implementations must be safe to share between request handlers and the
/// listener.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Send a `placeBet` transaction carrying `amount` and wait until it is
    /// mined.
    ///
    /// Returns the receipt whatever logs it contains; interpreting them is
    /// the caller's job.
    async fn place_bet(
        &self,
        multiplier: Multiplier,
        amount: &WeiAmount,
    ) -> Result<TransactionReceipt, GatewayError>;

    /// Establish the resolution subscription.
    ///
    /// Returns once the subscription is live. From then on every observed
    /// `BetResolved` event is pushed onto `sender` until `shutdown_rx` fires
    /// or the receiver is dropped. Events may be delivered more than once.
    async fn subscribe(
        &self,
        sender: ResolutionSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), GatewayError>;

    /// Fulfil the randomness request behind `correlation_id` right away.
    ///
    /// Only meaningful where the VRF coordinator is a mock. The resulting
    /// event still arrives through the subscription.
    async fn force_resolve(&self, correlation_id: &CorrelationId) -> Result<(), GatewayError>;
}
