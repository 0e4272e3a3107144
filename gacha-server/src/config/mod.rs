//! Configuration module for gacha-server.
//!
//! Handles loading configuration from the TOML file and CLI overrides, and
//! resolving contract addresses from the deployment file.
//!
//! Relative paths in the file are resolved against the directory holding the
//! config file.

pub mod file;
pub mod runtime;

use crate::config::file::{BetConfig, FileConfig, JsonRpcConfig, LedgerKind};
use crate::config::runtime::{BetSettings, LedgerSettings, LoadedConfig, ServerConfig};
use gacha_core::ledger::{Deployment, DeploymentError, JsonRpcLedgerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),
}

/// CLI overrides applied on top of the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub force_resolve: Option<bool>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Read contract addresses for the JSON-RPC ledger
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = self.read()?;
        validate(&file_config)?;
        let store_path = self.resolve(&file_config.store.path);

        let ledger = match file_config.ledger.kind {
            LedgerKind::Simulated => LedgerSettings::Simulated {
                player: file_config.ledger.simulated.player,
                auto_fulfill_after: file_config
                    .ledger
                    .simulated
                    .auto_fulfill_ms
                    .map(Duration::from_millis),
            },
            LedgerKind::JsonRpc => {
                let rpc = file_config.ledger.json_rpc.ok_or_else(missing_json_rpc)?;
                LedgerSettings::JsonRpc(self.json_rpc_settings(rpc, &store_path)?)
            }
        };

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: file_config.server.listen,
            },
            store_path,
            bet: bet_settings(&file_config.bet),
            ledger,
        })
    }

    /// Re-read the reloadable `[bet]` section (used during SIGHUP).
    pub fn reload_bet(&self) -> Result<BetSettings, ConfigError> {
        let file_config = self.read()?;
        validate(&file_config)?;
        Ok(bet_settings(&file_config.bet))
    }

    fn read(&self) -> Result<FileConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.overrides.listen {
            file_config.server.listen = listen;
        }
        if let Some(force_resolve) = self.overrides.force_resolve {
            file_config.bet.force_resolve = force_resolve;
        }
        Ok(file_config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match self.config_path.parent() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn json_rpc_settings(
        &self,
        rpc: JsonRpcConfig,
        store_path: &Path,
    ) -> Result<JsonRpcLedgerConfig, ConfigError> {
        let deployment_path = self.resolve(&rpc.deployment);
        let deployment = Deployment::load(&deployment_path)?;
        let cursor_path = match &rpc.cursor_path {
            Some(path) => self.resolve(path),
            None => default_cursor_path(store_path),
        };
        tracing::info!(
            game = %deployment.game,
            coordinator = %deployment.coordinator,
            "Loaded contract addresses from {}",
            deployment_path.display()
        );

        Ok(JsonRpcLedgerConfig {
            url: rpc.url,
            deployment,
            from: rpc.from,
            poll_interval: Duration::from_millis(rpc.poll_interval_ms),
            receipt_timeout: Duration::from_secs(rpc.receipt_timeout_secs),
            place_bet_function: rpc.place_bet_function,
            bet_placed_event: rpc.bet_placed_event,
            bet_resolved_event: rpc.bet_resolved_event,
            start_block: rpc.start_block,
            cursor_path: Some(cursor_path),
        })
    }
}

/// `data/bets.json` keeps its cursor in `data/bets.cursor.json`.
fn default_cursor_path(store_path: &Path) -> PathBuf {
    let stem = store_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    store_path.with_file_name(format!("{stem}.cursor.json"))
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.bet.submit_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "bet.submit_timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.ledger.kind == LedgerKind::JsonRpc {
        let rpc = config.ledger.json_rpc.as_ref().ok_or_else(missing_json_rpc)?;
        if rpc.poll_interval_ms == 0 || rpc.receipt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ledger.json_rpc poll_interval_ms and receipt_timeout_secs must be greater than zero"
                    .to_string(),
            ));
        }
    }
    Ok(())
}

fn missing_json_rpc() -> ConfigError {
    ConfigError::ValidationError(
        "ledger.kind is \"json_rpc\" but [ledger.json_rpc] is missing".to_string(),
    )
}

fn bet_settings(bet: &BetConfig) -> BetSettings {
    BetSettings {
        force_resolve: bet.force_resolve,
        submit_timeout: Duration::from_secs(bet.submit_timeout_secs),
    }
}
