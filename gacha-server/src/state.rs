//! Application state shared across all request handlers.

use crate::config::runtime::BetSettings;
use gacha_core::ledger::LedgerGateway;
use gacha_core::processors::{BetSubmitter, ListenerState};
use gacha_core::store::EventStore;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EventStore>,
    pub gateway: Arc<dyn LedgerGateway>,
    /// Bet settings (can be reloaded via SIGHUP).
    pub bet: Arc<RwLock<BetSettings>>,
    pub listener_state: watch::Receiver<ListenerState>,
}

impl AppState {
    pub fn new(
        store: Arc<EventStore>,
        gateway: Arc<dyn LedgerGateway>,
        bet: BetSettings,
        listener_state: watch::Receiver<ListenerState>,
    ) -> Self {
        Self {
            store,
            gateway,
            bet: Arc::new(RwLock::new(bet)),
            listener_state,
        }
    }

    /// A submitter using the current bet settings.
    pub async fn bet_submitter(&self) -> BetSubmitter {
        let bet = *self.bet.read().await;
        BetSubmitter::new(self.gateway.clone(), bet.submit_timeout, bet.force_resolve)
    }

    /// Update the bet settings (used during SIGHUP reload).
    pub async fn update_bet_settings(&self, new_settings: BetSettings) {
        let mut bet = self.bet.write().await;
        *bet = new_settings;
    }
}
