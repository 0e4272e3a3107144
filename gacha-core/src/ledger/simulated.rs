//! In-process ledger that behaves like the game contract deployed next to a
//! VRF coordinator mock.
//!
//! - `place_bet` records a pending randomness request and returns a receipt
//!   with a `BetPlaced` log. Request ids count up from 1.
//! - `force_resolve` plays the mock coordinator's `fulfillRandomWords`: it
//!   draws a random word, settles the bet and pushes `BetResolved` to every
//!   subscriber. Fulfilling an unknown or already fulfilled request reverts.
//! - With `auto_fulfill_after` set, each bet is also fulfilled on its own
//!   after the delay, like a live oracle would.

use super::abi::to_hex;
use super::{GatewayError, LedgerGateway, LedgerLog, TransactionReceipt};
use crate::entities::{CorrelationId, Multiplier, WeiAmount};
use crate::events::{ResolutionEvent, ResolutionSender};
use alloy_primitives::keccak256;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// First account of a Hardhat / Anvil development node.
pub const DEFAULT_PLAYER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// How many fulfilled requests are kept around for [`SimulatedLedger::redeliver`].
pub const REDELIVERY_WINDOW: usize = 1024;

/// Simulated game contract + VRF coordinator.
///
/// Cloning yields another handle to the same ledger.
#[derive(Clone)]
pub struct SimulatedLedger {
    inner: Arc<Inner>,
}

struct Inner {
    player: String,
    auto_fulfill_after: Option<Duration>,
    next_request_id: AtomicU64,
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    pending: HashMap<u64, PendingRequest>,
    /// Most recent fulfilments, oldest first, capped at [`REDELIVERY_WINDOW`].
    fulfilled: VecDeque<ResolutionEvent>,
    subscribers: Vec<ResolutionSender>,
}

impl LedgerState {
    fn remember(&mut self, event: ResolutionEvent) {
        if self.fulfilled.len() == REDELIVERY_WINDOW {
            self.fulfilled.pop_front();
        }
        self.fulfilled.push_back(event);
    }
}

struct PendingRequest {
    multiplier: Multiplier,
    amount: WeiAmount,
}

impl SimulatedLedger {
    /// Create a ledger whose bets are all placed by `player`.
    ///
    /// With `auto_fulfill_after` set, every bet is fulfilled by itself after
    /// that delay.
    pub fn new(player: impl Into<String>, auto_fulfill_after: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                player: player.into(),
                auto_fulfill_after,
                next_request_id: AtomicU64::new(1),
                state: Mutex::new(LedgerState::default()),
            }),
        }
    }

    /// Push an already delivered resolution again, as a flaky subscription
    /// might. Only the last [`REDELIVERY_WINDOW`] fulfilments can be repeated.
    pub async fn redeliver(&self, correlation_id: &CorrelationId) -> Result<(), GatewayError> {
        let (event, subscribers) = {
            let state = self.inner.state.lock().await;
            let event = state
                .fulfilled
                .iter()
                .find(|event| &event.correlation_id == correlation_id)
                .cloned()
                .ok_or_else(|| GatewayError::Reverted {
                    reason: format!("request {correlation_id} has not been fulfilled recently"),
                })?;
            (event, state.subscribers.clone())
        };
        self.inner.publish(event, subscribers).await;
        Ok(())
    }

    /// Number of bets still waiting for randomness.
    pub async fn pending_requests(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER, None)
    }
}

impl Inner {
    async fn fulfill(&self, request_id: u64) -> Result<(), GatewayError> {
        let (event, subscribers) = {
            let mut state = self.state.lock().await;
            let request = state
                .pending
                .remove(&request_id)
                .ok_or_else(|| GatewayError::Reverted {
                    reason: format!("nonexistent request {request_id}"),
                })?;

            let multiplier = u128::from(request.multiplier.get());
            let random_word: u64 = rand::random();
            let won = random_word % multiplier as u64 == 0;
            let payout = if won {
                request
                    .amount
                    .as_u128()
                    .and_then(|amount| amount.checked_mul(multiplier))
                    .map(WeiAmount::from_u128)
                    .ok_or_else(|| GatewayError::Reverted {
                        reason: format!("payout overflow for request {request_id}"),
                    })?
            } else {
                WeiAmount::zero()
            };

            let event = ResolutionEvent {
                correlation_id: CorrelationId::from(request_id),
                subject: self.player.clone(),
                outcome: won,
                amount: payout,
            };
            state.remember(event.clone());
            (event, state.subscribers.clone())
        };

        debug!(
            correlation_id = %event.correlation_id,
            won = event.outcome,
            payout = %event.amount,
            "Simulated VRF fulfilment"
        );
        self.publish(event, subscribers).await;
        Ok(())
    }

    async fn publish(&self, event: ResolutionEvent, subscribers: Vec<ResolutionSender>) {
        let mut closed = false;
        for subscriber in &subscribers {
            if subscriber.send(event.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            self.state
                .lock()
                .await
                .subscribers
                .retain(|s| !s.is_closed());
        }
    }
}

#[async_trait]
impl LedgerGateway for SimulatedLedger {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn place_bet(
        &self,
        multiplier: Multiplier,
        amount: &WeiAmount,
    ) -> Result<TransactionReceipt, GatewayError> {
        if amount.is_zero() {
            return Err(GatewayError::Reverted {
                reason: "bet amount must be positive".to_string(),
            });
        }

        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        self.inner.state.lock().await.pending.insert(
            request_id,
            PendingRequest {
                multiplier,
                amount: amount.clone(),
            },
        );

        let tx_hash = to_hex(keccak256(format!("placeBet:{request_id}").as_bytes()));
        debug!(request_id, %multiplier, %amount, %tx_hash, "Simulated placeBet");

        if let Some(delay) = self.inner.auto_fulfill_after {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = inner.fulfill(request_id).await {
                    // Already forced by the caller.
                    debug!(request_id, error = %e, "Automatic fulfilment skipped");
                }
            });
        }

        Ok(TransactionReceipt {
            tx_hash,
            logs: vec![LedgerLog::BetPlaced {
                correlation_id: CorrelationId::from(request_id),
                player: self.inner.player.clone(),
            }],
        })
    }

    async fn subscribe(
        &self,
        sender: ResolutionSender,
        _shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        self.inner.state.lock().await.subscribers.push(sender);
        info!("Subscribed to simulated BetResolved events");
        Ok(())
    }

    async fn force_resolve(&self, correlation_id: &CorrelationId) -> Result<(), GatewayError> {
        let request_id = parse_request_id(correlation_id)?;
        self.inner.fulfill(request_id).await.inspect_err(|e| {
            warn!(%correlation_id, error = %e, "Simulated fulfillRandomWords reverted");
        })
    }
}

fn parse_request_id(correlation_id: &CorrelationId) -> Result<u64, GatewayError> {
    correlation_id
        .as_str()
        .parse()
        .map_err(|_| GatewayError::Reverted {
            reason: format!("nonexistent request {correlation_id}"),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::resolution_channel;

    fn ether(value: &str) -> WeiAmount {
        WeiAmount::parse_ether(value).unwrap()
    }

    #[tokio::test]
    async fn place_bet_emits_bet_placed_with_increasing_ids() {
        let ledger = SimulatedLedger::default();
        let multiplier = Multiplier::new(3).unwrap();

        let first = ledger.place_bet(multiplier, &ether("0.1")).await.unwrap();
        let second = ledger.place_bet(multiplier, &ether("0.2")).await.unwrap();

        assert_eq!(first.bet_placed_id(), Some(&CorrelationId::from(1)));
        assert_eq!(second.bet_placed_id(), Some(&CorrelationId::from(2)));
        assert_ne!(first.tx_hash, second.tx_hash);
        assert_eq!(ledger.pending_requests().await, 2);
    }

    #[tokio::test]
    async fn force_resolve_settles_once() {
        let ledger = SimulatedLedger::default();
        let (tx, mut rx) = resolution_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        ledger.subscribe(tx, shutdown_rx).await.unwrap();

        let amount = ether("0.5");
        let receipt = ledger
            .place_bet(Multiplier::new(4).unwrap(), &amount)
            .await
            .unwrap();
        let id = receipt.bet_placed_id().unwrap().clone();

        ledger.force_resolve(&id).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.correlation_id, id);
        assert_eq!(event.subject, DEFAULT_PLAYER);
        if event.outcome {
            assert_eq!(event.amount, WeiAmount::from_u128(2_000_000_000_000_000_000));
        } else {
            assert!(event.amount.is_zero());
        }

        let again = ledger.force_resolve(&id).await;
        assert!(matches!(again, Err(GatewayError::Reverted { .. })));
        assert_eq!(ledger.pending_requests().await, 0);
    }

    #[tokio::test]
    async fn force_resolve_unknown_request_reverts() {
        let ledger = SimulatedLedger::default();
        assert!(matches!(
            ledger.force_resolve(&CorrelationId::from(99)).await,
            Err(GatewayError::Reverted { .. })
        ));
        assert!(matches!(
            ledger.force_resolve(&CorrelationId::from("not-a-number")).await,
            Err(GatewayError::Reverted { .. })
        ));
    }

    #[tokio::test]
    async fn redeliver_repeats_the_same_event() {
        let ledger = SimulatedLedger::default();
        let (tx, mut rx) = resolution_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        ledger.subscribe(tx, shutdown_rx).await.unwrap();

        let receipt = ledger
            .place_bet(Multiplier::new(2).unwrap(), &ether("1"))
            .await
            .unwrap();
        let id = receipt.bet_placed_id().unwrap().clone();
        ledger.force_resolve(&id).await.unwrap();
        ledger.redeliver(&id).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn redelivery_window_is_bounded() {
        let ledger = SimulatedLedger::default();
        let multiplier = Multiplier::new(2).unwrap();
        let mut ids = Vec::new();
        for _ in 0..=REDELIVERY_WINDOW {
            let receipt = ledger.place_bet(multiplier, &ether("0.01")).await.unwrap();
            let id = receipt.bet_placed_id().unwrap().clone();
            ledger.force_resolve(&id).await.unwrap();
            ids.push(id);
        }

        assert_eq!(
            ledger.inner.state.lock().await.fulfilled.len(),
            REDELIVERY_WINDOW
        );
        assert!(matches!(
            ledger.redeliver(&ids[0]).await,
            Err(GatewayError::Reverted { .. })
        ));
        ledger.redeliver(&ids[REDELIVERY_WINDOW]).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn auto_fulfill_resolves_without_force() {
        let ledger = SimulatedLedger::new(DEFAULT_PLAYER, Some(Duration::from_secs(5)));
        let (tx, mut rx) = resolution_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        ledger.subscribe(tx, shutdown_rx).await.unwrap();

        let receipt = ledger
            .place_bet(Multiplier::new(10).unwrap(), &ether("0.01"))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(Some(&event.correlation_id), receipt.bet_placed_id());
        assert_eq!(ledger.pending_requests().await, 0);
    }
}
