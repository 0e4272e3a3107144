//! TOML file configuration structures.
//!
//! These structs directly map to the `gacha-config.toml` file format.

use gacha_core::ledger::json_rpc::{
    DEFAULT_BET_PLACED_EVENT, DEFAULT_BET_RESOLVED_EVENT, DEFAULT_PLACE_BET_FUNCTION,
};
use gacha_core::ledger::simulated::DEFAULT_PLAYER;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub bet: BetConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:3000").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

/// Event store section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON file holding resolved bets.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/bets.json")
}

/// Bet placement section. Reloadable.
#[derive(Debug, Clone, Deserialize)]
pub struct BetConfig {
    /// Fulfil randomness right after each bet (dev networks with a VRF mock).
    #[serde(default = "default_true")]
    pub force_resolve: bool,
    /// Upper bound on waiting for the ledger to accept a bet.
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
}

impl Default for BetConfig {
    fn default() -> Self {
        Self {
            force_resolve: true,
            submit_timeout_secs: default_submit_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_submit_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    #[default]
    Simulated,
    JsonRpc,
}

/// Ledger section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub kind: LedgerKind,
    #[serde(default)]
    pub simulated: SimulatedConfig,
    pub json_rpc: Option<JsonRpcConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedConfig {
    /// Address reported as the player of every bet.
    #[serde(default = "default_player")]
    pub player: String,
    /// Fulfil bets on their own after this many milliseconds.
    pub auto_fulfill_ms: Option<u64>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            auto_fulfill_ms: None,
        }
    }
}

fn default_player() -> String {
    DEFAULT_PLAYER.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcConfig {
    /// Node endpoint, e.g. `http://127.0.0.1:8545`.
    pub url: Url,
    /// `deployed.json` written by the deploy script.
    #[serde(default = "default_deployment_path")]
    pub deployment: PathBuf,
    /// Sender account; the node's first account if unset.
    pub from: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_place_bet_function")]
    pub place_bet_function: String,
    #[serde(default = "default_bet_placed_event")]
    pub bet_placed_event: String,
    #[serde(default = "default_bet_resolved_event")]
    pub bet_resolved_event: String,
    /// First block to scan when no cursor has been saved yet.
    pub start_block: Option<u64>,
    /// Log poller cursor; `<store file stem>.cursor.json` next to the store
    /// if unset.
    pub cursor_path: Option<PathBuf>,
}

fn default_deployment_path() -> PathBuf {
    PathBuf::from("deployed.json")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_receipt_timeout_secs() -> u64 {
    30
}

fn default_place_bet_function() -> String {
    DEFAULT_PLACE_BET_FUNCTION.to_string()
}

fn default_bet_placed_event() -> String {
    DEFAULT_BET_PLACED_EVENT.to_string()
}

fn default_bet_resolved_event() -> String {
    DEFAULT_BET_RESOLVED_EVENT.to_string()
}
