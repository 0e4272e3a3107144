//! Runtime configuration built from the validated file configuration.

use gacha_core::ledger::{
    GatewayError, JsonRpcLedger, JsonRpcLedgerConfig, LedgerGateway, SimulatedLedger,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Bet placement settings. Reloaded on SIGHUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetSettings {
    pub force_resolve: bool,
    pub submit_timeout: Duration,
}

/// Which ledger gateway to run against. Fixed for the process lifetime.
#[derive(Debug, Clone)]
pub enum LedgerSettings {
    Simulated {
        player: String,
        auto_fulfill_after: Option<Duration>,
    },
    JsonRpc(JsonRpcLedgerConfig),
}

impl LedgerSettings {
    pub fn build_gateway(self) -> Result<Arc<dyn LedgerGateway>, GatewayError> {
        Ok(match self {
            LedgerSettings::Simulated {
                player,
                auto_fulfill_after,
            } => Arc::new(SimulatedLedger::new(player, auto_fulfill_after)),
            LedgerSettings::JsonRpc(config) => Arc::new(JsonRpcLedger::new(config)?),
        })
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub store_path: PathBuf,
    pub bet: BetSettings,
    pub ledger: LedgerSettings,
}
