//! Bet submission.
//!
//! Validates the request, sends the bet through the ledger gateway under a
//! bounded timeout and pulls the correlation id out of the receipt's
//! `BetPlaced` log. With force-resolve enabled the randomness request is
//! fulfilled right after, the way a dev network with a VRF mock needs it.

use crate::entities::{CorrelationId, Multiplier, ValidationError, WeiAmount};
use crate::ledger::{GatewayError, LedgerGateway};
use kanau::processor::Processor;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default bound on how long a `placeBet` call may take.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// A bet as requested by a client, not yet validated.
#[derive(Debug, Clone)]
pub struct PlaceBet {
    pub multiplier: i64,
    /// Decimal ether string, e.g. `"0.1"`.
    pub amount: String,
}

/// A bet the ledger accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBet {
    pub correlation_id: CorrelationId,
    pub tx_hash: String,
}

/// The ledger did not (verifiably) accept the bet.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The call did not finish in time. The bet may still have been
    /// accepted on-chain; it is not retried.
    #[error("ledger did not acknowledge the bet within {0:?}")]
    Timeout(Duration),

    /// The transaction succeeded but emitted no `BetPlaced` log.
    #[error("expected BetPlaced event missing from transaction {tx_hash}")]
    MissingBetPlaced { tx_hash: String },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Places bets on the ledger.
#[derive(Clone)]
pub struct BetSubmitter {
    pub gateway: Arc<dyn LedgerGateway>,
    pub timeout: Duration,
    /// Fulfil each bet's randomness request immediately after placing it.
    pub force_resolve: bool,
}

impl BetSubmitter {
    pub fn new(gateway: Arc<dyn LedgerGateway>, timeout: Duration, force_resolve: bool) -> Self {
        Self {
            gateway,
            timeout,
            force_resolve,
        }
    }

    /// Send the bet and extract its correlation id. Does not force-resolve.
    pub async fn submit_bet(
        &self,
        multiplier: Multiplier,
        amount: &WeiAmount,
    ) -> Result<PlacedBet, SubmissionError> {
        let receipt = tokio::time::timeout(self.timeout, self.gateway.place_bet(multiplier, amount))
            .await
            .map_err(|_| SubmissionError::Timeout(self.timeout))??;

        let Some(correlation_id) = receipt.bet_placed_id().cloned() else {
            return Err(SubmissionError::MissingBetPlaced {
                tx_hash: receipt.tx_hash,
            });
        };
        Ok(PlacedBet {
            correlation_id,
            tx_hash: receipt.tx_hash,
        })
    }
}

impl Processor<PlaceBet> for BetSubmitter {
    type Output = PlacedBet;
    type Error = SubmitError;

    /// Failures are returned, not logged at error level: the caller decides
    /// how loudly to report them.
    #[tracing::instrument(skip_all, fields(multiplier = request.multiplier, gateway = self.gateway.name()))]
    async fn process(&self, request: PlaceBet) -> Result<PlacedBet, SubmitError> {
        let (multiplier, amount) = match validate(&request) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, amount = %request.amount, "Bet rejected");
                return Err(e.into());
            }
        };

        let placed = self.submit_bet(multiplier, &amount).await?;
        info!(
            correlation_id = %placed.correlation_id,
            tx_hash = %placed.tx_hash,
            %multiplier,
            wei = %amount,
            "Bet placed"
        );

        if self.force_resolve {
            // The listener stays authoritative; a failed force only delays resolution.
            if let Err(e) = self.gateway.force_resolve(&placed.correlation_id).await {
                warn!(
                    correlation_id = %placed.correlation_id,
                    error = %e,
                    "Force resolve failed"
                );
            }
        }

        Ok(placed)
    }
}

fn validate(request: &PlaceBet) -> Result<(Multiplier, WeiAmount), ValidationError> {
    Ok((
        Multiplier::new(request.multiplier)?,
        WeiAmount::parse_ether(&request.amount)?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::events::ResolutionSender;
    use crate::ledger::{LedgerLog, SimulatedLedger, TransactionReceipt};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::watch;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    /// What the scripted gateway does on `place_bet`.
    pub(crate) enum Script {
        Receipt(Vec<LedgerLog>),
        Revert,
        Hang,
    }

    pub(crate) struct ScriptedGateway {
        pub script: Script,
        pub subscribe_fails: bool,
        pub force_fails: bool,
        pub forced: AtomicUsize,
    }

    impl ScriptedGateway {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                subscribe_fails: false,
                force_fails: false,
                forced: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LedgerGateway for ScriptedGateway {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn place_bet(
            &self,
            _multiplier: Multiplier,
            _amount: &WeiAmount,
        ) -> Result<TransactionReceipt, GatewayError> {
            match &self.script {
                Script::Receipt(logs) => Ok(TransactionReceipt {
                    tx_hash: "0xabc".to_string(),
                    logs: logs.clone(),
                }),
                Script::Revert => Err(GatewayError::Reverted {
                    reason: "Bet too large".to_string(),
                }),
                Script::Hang => std::future::pending().await,
            }
        }

        async fn subscribe(
            &self,
            _sender: ResolutionSender,
            _shutdown_rx: watch::Receiver<bool>,
        ) -> Result<(), GatewayError> {
            if self.subscribe_fails {
                Err(GatewayError::Rpc {
                    code: -32000,
                    message: "connection refused".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn force_resolve(&self, _id: &CorrelationId) -> Result<(), GatewayError> {
            self.forced.fetch_add(1, Ordering::SeqCst);
            if self.force_fails {
                Err(GatewayError::Reverted {
                    reason: "nonexistent request".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn bet(multiplier: i64, amount: &str) -> PlaceBet {
        PlaceBet {
            multiplier,
            amount: amount.to_string(),
        }
    }

    fn submitter(gateway: Arc<dyn LedgerGateway>, force_resolve: bool) -> BetSubmitter {
        BetSubmitter::new(gateway, Duration::from_secs(5), force_resolve)
    }

    #[tokio::test]
    async fn multiplier_bounds_are_inclusive() {
        let submitter = submitter(Arc::new(SimulatedLedger::default()), false);

        for m in [1, 11, 0, -3] {
            let err = submitter.process(bet(m, "0.1")).await.unwrap_err();
            assert!(
                matches!(err, SubmitError::Validation(ValidationError::MultiplierOutOfRange { .. })),
                "multiplier {m} should be rejected"
            );
        }
        for m in [2, 10] {
            let placed = submitter.process(bet(m, "0.1")).await.unwrap();
            assert!(!placed.correlation_id.as_str().is_empty());
        }
    }

    #[tokio::test]
    async fn bad_amounts_are_validation_errors() {
        let submitter = submitter(Arc::new(SimulatedLedger::default()), false);
        for amount in ["", "0", "-1", "abc", "1e18", "0.0000000000000000001"] {
            let err = submitter.process(bet(2, amount)).await.unwrap_err();
            assert!(
                matches!(err, SubmitError::Validation(_)),
                "amount {amount:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn missing_bet_placed_is_a_submission_error() {
        let gateway = ScriptedGateway::new(Script::Receipt(vec![LedgerLog::Other {
            address: "0xcoordinator".to_string(),
            topic: None,
        }]));
        let err = submitter(Arc::new(gateway), false)
            .process(bet(3, "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Submission(SubmissionError::MissingBetPlaced { .. })
        ));
    }

    #[tokio::test]
    async fn revert_is_a_submission_error() {
        let err = submitter(Arc::new(ScriptedGateway::new(Script::Revert)), false)
            .process(bet(3, "0.1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Submission(SubmissionError::Gateway(GatewayError::Reverted { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_ledger_times_out() {
        let submitter = BetSubmitter::new(
            Arc::new(ScriptedGateway::new(Script::Hang)),
            Duration::from_secs(2),
            false,
        );
        let err = submitter.process(bet(3, "0.1")).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Submission(SubmissionError::Timeout(d)) if d == Duration::from_secs(2)
        ));
    }

    #[tokio::test]
    async fn force_resolve_failure_does_not_fail_the_bet() {
        let mut gateway = ScriptedGateway::new(Script::Receipt(vec![LedgerLog::BetPlaced {
            correlation_id: CorrelationId::from(12),
            player: "0xplayer".to_string(),
        }]));
        gateway.force_fails = true;
        let gateway = Arc::new(gateway);

        let placed = submitter(gateway.clone(), true)
            .process(bet(5, "2"))
            .await
            .unwrap();
        assert_eq!(placed.correlation_id, CorrelationId::from(12));
        assert_eq!(gateway.forced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_resolve_is_skipped_when_disabled() {
        let gateway = Arc::new(ScriptedGateway::new(Script::Receipt(vec![
            LedgerLog::BetPlaced {
                correlation_id: CorrelationId::from(1),
                player: "0xplayer".to_string(),
            },
        ])));
        submitter(gateway.clone(), false)
            .process(bet(5, "2"))
            .await
            .unwrap();
        assert_eq!(gateway.forced.load(Ordering::SeqCst), 0);
    }

    /// Counts events logged at ERROR.
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn rejected_and_failed_bets_are_not_logged_as_errors() {
        let errors = Arc::new(AtomicUsize::new(0));
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(ErrorCounter(errors.clone())),
        );

        let valid = submitter(Arc::new(SimulatedLedger::default()), false);
        assert!(valid.process(bet(11, "0.1")).await.is_err());
        assert!(valid.process(bet(3, "abc")).await.is_err());
        let reverting = submitter(Arc::new(ScriptedGateway::new(Script::Revert)), false);
        assert!(reverting.process(bet(3, "0.1")).await.is_err());

        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }
}
