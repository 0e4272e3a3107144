//! ResolutionListener processor.
//!
//! The ResolutionListener is responsible for:
//! - Establishing the ledger's resolution subscription at startup
//! - Draining `ResolutionEvent`s from the resolution channel
//! - Reconciling each event into the `EventStore` (first write wins)
//!
//! A failed subscription is fatal to startup. Failures while reconciling a
//! single event are logged and the listener moves on to the next one.
//!
//! On shutdown the channel is closed and whatever is already buffered is
//! still reconciled before the listener stops.

use crate::entities::ResolutionRecord;
use crate::errors::InitializationError;
use crate::events::{resolution_channel, ResolutionEvent, ResolutionReceiver};
use crate::ledger::LedgerGateway;
use crate::store::{EventStore, PutOutcome, PutResolution, StoreError};
use kanau::processor::Processor;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Lifecycle of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    NotStarted,
    Subscribed,
    SubscriptionFailed,
    /// The channel closed or shutdown was requested.
    Stopped,
}

impl ListenerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ListenerState::NotStarted => "not_started",
            ListenerState::Subscribed => "subscribed",
            ListenerState::SubscriptionFailed => "subscription_failed",
            ListenerState::Stopped => "stopped",
        }
    }
}

/// Reconciles ledger resolutions into the event store.
pub struct ResolutionListener {
    store: Arc<EventStore>,
    shutdown_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<ListenerState>,
}

/// A running listener.
pub struct ListenerHandle {
    pub join: JoinHandle<()>,
    pub state: watch::Receiver<ListenerState>,
}

impl ResolutionListener {
    pub fn new(store: Arc<EventStore>, shutdown_rx: watch::Receiver<bool>) -> Self {
        let (state_tx, _) = watch::channel(ListenerState::NotStarted);
        Self {
            store,
            shutdown_rx,
            state_tx,
        }
    }

    /// Watch the listener's state, e.g. for readiness checks.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state_tx.subscribe()
    }

    /// Subscribe through `gateway` and spawn the reconciliation loop.
    ///
    /// Returns once the subscription is live.
    pub async fn start(
        self,
        gateway: &dyn LedgerGateway,
    ) -> Result<ListenerHandle, InitializationError> {
        let (tx, rx) = resolution_channel();
        if let Err(e) = gateway.subscribe(tx, self.shutdown_rx.clone()).await {
            error!(gateway = gateway.name(), error = %e, "Resolution subscription failed");
            self.state_tx.send_replace(ListenerState::SubscriptionFailed);
            return Err(InitializationError::Subscription(e));
        }

        self.state_tx.send_replace(ListenerState::Subscribed);
        info!(gateway = gateway.name(), "ResolutionListener subscribed");

        let state = self.state();
        let join = tokio::spawn(self.run(rx));
        Ok(ListenerHandle { join, state })
    }

    async fn run(mut self, mut rx: ResolutionReceiver) {
        info!("ResolutionListener started");

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("ResolutionListener shutting down");
                        rx.close();
                        let mut drained = 0usize;
                        while let Some(event) = rx.recv().await {
                            self.reconcile(event).await;
                            drained += 1;
                        }
                        if drained > 0 {
                            info!(drained, "Reconciled buffered resolutions before stopping");
                        }
                        break;
                    }
                }

                event = rx.recv() => {
                    let Some(event) = event else {
                        info!("Resolution channel closed");
                        break;
                    };
                    self.reconcile(event).await;
                }
            }
        }

        self.state_tx.send_replace(ListenerState::Stopped);
        info!("ResolutionListener shutdown complete");
    }

    async fn reconcile(&self, event: ResolutionEvent) {
        let correlation_id = event.correlation_id.clone();
        if let Err(e) = self.process(event).await {
            // Lost for this delivery; a redelivery will retry.
            error!(%correlation_id, error = %e, "Failed to reconcile resolution");
        }
    }
}

impl Processor<ResolutionEvent> for ResolutionListener {
    type Output = PutOutcome;
    type Error = StoreError;

    async fn process(&self, event: ResolutionEvent) -> Result<PutOutcome, StoreError> {
        let record = ResolutionRecord::from_event(event, OffsetDateTime::now_utc());
        let correlation_id = record.correlation_id.clone();
        let outcome = self.store.process(PutResolution { record }).await?;
        match outcome {
            PutOutcome::Inserted => info!(%correlation_id, "Resolution recorded"),
            PutOutcome::AlreadyExisted => {
                debug!(%correlation_id, "Duplicate resolution ignored")
            }
        }
        Ok(outcome)
    }
}
