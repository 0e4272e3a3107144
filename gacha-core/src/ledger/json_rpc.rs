//! EVM JSON-RPC ledger gateway.
//!
//! Talks to a development node (Hardhat, Anvil) that has the game contract
//! and a VRF coordinator mock deployed. Transactions are sent with
//! `eth_sendTransaction` from an unlocked node account, receipts are polled
//! with `eth_getTransactionReceipt`, and the resolution subscription polls
//! `eth_getLogs` over successive block ranges.
//!
//! Event arguments are decoded positionally: indexed topics first, then the
//! data words. Event signatures whose indexed parameters are not leading
//! ones need a matching signature override in the configuration.
//!
//! The poller resumes from a [`BlockCursor`] when one is configured, so logs
//! mined while the process was down are still picked up.

use super::abi::{
    decode_word, decode_words, encode_call, event_topic, format_address, format_quantity,
    parse_address, parse_quantity, word_to_address, word_to_bool, word_to_uint,
};
use super::cursor::BlockCursor;
use super::{GatewayError, LedgerGateway, LedgerLog, TransactionReceipt};
use crate::entities::{CorrelationId, Multiplier, WeiAmount};
use crate::events::{ResolutionEvent, ResolutionSender};
use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, error, info, warn};
use url::Url;

pub const DEFAULT_PLACE_BET_FUNCTION: &str = "placeBet(uint256)";
pub const DEFAULT_BET_PLACED_EVENT: &str = "BetPlaced(uint256,address,uint256,uint256)";
pub const DEFAULT_BET_RESOLVED_EVENT: &str = "BetResolved(uint256,address,bool,uint256)";
const FULFILL_RANDOM_WORDS: &str = "fulfillRandomWords(uint256,address)";

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Contract addresses written by the deployment script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deployment {
    #[serde(rename = "GachaGame")]
    pub game: String,
    #[serde(rename = "VRFCoordinatorV2Mock")]
    pub coordinator: String,
}

impl Deployment {
    /// Read `deployed.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeploymentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| DeploymentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DeploymentError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("deployment file {path} not readable (run the deploy script first): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("deployment file {path} is missing a contract address: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for [`JsonRpcLedger`].
#[derive(Debug, Clone)]
pub struct JsonRpcLedgerConfig {
    pub url: Url,
    pub deployment: Deployment,
    /// Account to send transactions from. Defaults to the node's first
    /// account.
    pub from: Option<String>,
    /// Interval between `eth_getLogs` polls.
    pub poll_interval: Duration,
    /// How long to wait for a transaction to be mined.
    pub receipt_timeout: Duration,
    pub place_bet_function: String,
    pub bet_placed_event: String,
    pub bet_resolved_event: String,
    /// First block to scan when no cursor has been saved yet. The block
    /// after the current head if unset.
    pub start_block: Option<u64>,
    /// Where to persist the poller's position. Not persisted if unset.
    pub cursor_path: Option<PathBuf>,
}

/// Ledger gateway backed by an EVM JSON-RPC node.
///
/// Cloning yields another handle sharing the HTTP client and sender account.
#[derive(Clone)]
pub struct JsonRpcLedger {
    inner: Arc<RpcInner>,
}

struct RpcInner {
    config: JsonRpcLedgerConfig,
    http_client: reqwest::Client,
    next_id: AtomicU64,
    sender: OnceCell<String>,
    cursor: Option<BlockCursor>,
    bet_placed_topic: String,
    bet_resolved_topic: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    data: String,
}

impl JsonRpcLedger {
    pub fn new(config: JsonRpcLedgerConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let bet_placed_topic = event_topic(&config.bet_placed_event);
        let bet_resolved_topic = event_topic(&config.bet_resolved_event);
        let cursor = config.cursor_path.clone().map(BlockCursor::new);
        Ok(Self {
            inner: Arc::new(RpcInner {
                config,
                http_client,
                next_id: AtomicU64::new(1),
                sender: OnceCell::new(),
                cursor,
                bet_placed_topic,
                bet_resolved_topic,
            }),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response: RpcResponse = self
            .inner
            .http_client
            .post(self.inner.config.url.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(GatewayError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        serde_json::from_value(response.result)
            .map_err(|e| GatewayError::Malformed(format!("{method}: {e}")))
    }

    async fn sender(&self) -> Result<&str, GatewayError> {
        let sender = self
            .inner
            .sender
            .get_or_try_init(|| async {
                if let Some(from) = &self.inner.config.from {
                    return Ok(from.clone());
                }
                let accounts: Vec<String> = self.call("eth_accounts", json!([])).await?;
                accounts.into_iter().next().ok_or(GatewayError::NoAccount)
            })
            .await?;
        Ok(sender.as_str())
    }

    async fn block_number(&self) -> Result<u64, GatewayError> {
        let quantity: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&quantity)
    }

    /// Send a transaction and wait for it to be mined successfully.
    #[tracing::instrument(skip(self, data), err(level = "warn"), name = "RPC:SendTransaction")]
    async fn send_and_confirm(
        &self,
        to: &str,
        data: String,
        value: Option<u128>,
    ) -> Result<TransactionReceipt, GatewayError> {
        let from = self.sender().await?.to_string();
        let mut tx = json!({ "from": from, "to": to, "data": data });
        if let Some(value) = value {
            tx["value"] = json!(format_quantity(value));
        }

        let tx_hash: String = self.call("eth_sendTransaction", json!([tx])).await?;
        debug!(%tx_hash, "Transaction sent, waiting for receipt");

        let raw = self.wait_for_receipt(&tx_hash).await?;
        if raw.status.as_deref() == Some("0x0") {
            return Err(GatewayError::Reverted {
                reason: format!("transaction {} reverted", raw.transaction_hash),
            });
        }

        let logs = raw
            .logs
            .iter()
            .map(|log| self.decode_log(log))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TransactionReceipt {
            tx_hash: raw.transaction_hash,
            logs,
        })
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<RawReceipt, GatewayError> {
        let poll = async {
            loop {
                let receipt: Option<RawReceipt> = self
                    .call("eth_getTransactionReceipt", json!([tx_hash]))
                    .await?;
                if let Some(receipt) = receipt {
                    break Ok::<_, GatewayError>(receipt);
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(self.inner.config.receipt_timeout, poll)
            .await
            .map_err(|_| GatewayError::ReceiptTimeout {
                tx_hash: tx_hash.to_string(),
            })?
    }

    fn decode_log(&self, log: &RawLog) -> Result<LedgerLog, GatewayError> {
        let topic = log.topics.first().map(|t| t.to_lowercase());
        let from_game = log
            .address
            .eq_ignore_ascii_case(&self.inner.config.deployment.game);

        match topic {
            Some(t) if from_game && t == self.inner.bet_placed_topic => {
                let args = event_args(log)?;
                let [request_id, player, ..] = args.as_slice() else {
                    return Err(GatewayError::Malformed(format!(
                        "BetPlaced log has {} arguments",
                        args.len()
                    )));
                };
                Ok(LedgerLog::BetPlaced {
                    correlation_id: CorrelationId::from_uint(word_to_uint(request_id)),
                    player: format_address(&word_to_address(player)),
                })
            }
            Some(t) if from_game && t == self.inner.bet_resolved_topic => {
                Ok(LedgerLog::BetResolved(self.decode_resolution(log)?))
            }
            topic => Ok(LedgerLog::Other {
                address: log.address.clone(),
                topic,
            }),
        }
    }

    fn decode_resolution(&self, log: &RawLog) -> Result<ResolutionEvent, GatewayError> {
        let args = event_args(log)?;
        let [request_id, player, won, payout, ..] = args.as_slice() else {
            return Err(GatewayError::Malformed(format!(
                "BetResolved log has {} arguments",
                args.len()
            )));
        };
        Ok(ResolutionEvent {
            correlation_id: CorrelationId::from_uint(word_to_uint(request_id)),
            subject: format_address(&word_to_address(player)),
            outcome: word_to_bool(won),
            amount: WeiAmount::from_uint(word_to_uint(payout)),
        })
    }

    /// Fetch `BetResolved` logs from `from_block` up to the current head and
    /// push them onto `sender`. Returns the next block to poll from.
    async fn poll_resolutions(
        &self,
        from_block: u64,
        sender: &ResolutionSender,
    ) -> Result<u64, GatewayError> {
        let head = self.block_number().await?;
        if head < from_block {
            return Ok(from_block);
        }

        let logs: Vec<RawLog> = self
            .call(
                "eth_getLogs",
                json!([{
                    "fromBlock": format_quantity(u128::from(from_block)),
                    "toBlock": format_quantity(u128::from(head)),
                    "address": self.inner.config.deployment.game,
                    "topics": [self.inner.bet_resolved_topic],
                }]),
            )
            .await?;

        for log in &logs {
            match self.decode_resolution(log) {
                Ok(event) => {
                    debug!(correlation_id = %event.correlation_id, "Observed BetResolved log");
                    if sender.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Skipping undecodable BetResolved log"),
            }
        }
        Ok(head + 1)
    }

    async fn save_cursor(&self, block: u64) {
        let Some(cursor) = &self.inner.cursor else {
            return;
        };
        if let Err(e) = cursor.save(block).await {
            // Only costs a longer rescan after a restart.
            warn!(block, error = %e, "Failed to save log poller cursor");
        }
    }

    /// Where polling starts: the saved cursor, else the configured start
    /// block, else the block after `head`.
    async fn resume_block(&self, head: u64) -> Result<u64, GatewayError> {
        if let Some(cursor) = &self.inner.cursor {
            if let Some(block) = cursor.load().await? {
                info!(block, path = %cursor.path().display(), "Resuming BetResolved logs from cursor");
                return Ok(block);
            }
        }
        Ok(self.inner.config.start_block.unwrap_or(head + 1))
    }

    async fn run_subscription(
        self,
        mut next_block: u64,
        sender: ResolutionSender,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!(from_block = next_block, "BetResolved log poller started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("BetResolved log poller shutting down");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.inner.config.poll_interval) => {
                    match self.poll_resolutions(next_block, &sender).await {
                        Ok(next) if next > next_block => {
                            self.save_cursor(next_block).await;
                            next_block = next;
                        }
                        Ok(_) => {}
                        Err(e) => error!(from_block = next_block, error = %e, "Polling BetResolved logs failed"),
                    }
                    if sender.is_closed() {
                        info!("Resolution receiver dropped, stopping log poller");
                        break;
                    }
                }
            }
        }
    }
}

/// Indexed topics after topic 0, then the data words.
fn event_args(log: &RawLog) -> Result<Vec<B256>, GatewayError> {
    let mut args = log
        .topics
        .iter()
        .skip(1)
        .map(|t| decode_word(t))
        .collect::<Result<Vec<_>, _>>()?;
    args.extend(decode_words(&log.data)?);
    Ok(args)
}

#[async_trait]
impl LedgerGateway for JsonRpcLedger {
    fn name(&self) -> &'static str {
        "json_rpc"
    }

    async fn place_bet(
        &self,
        multiplier: Multiplier,
        amount: &WeiAmount,
    ) -> Result<TransactionReceipt, GatewayError> {
        let value = amount
            .as_u128()
            .ok_or_else(|| GatewayError::Malformed(format!("amount {amount} exceeds u128")))?;
        let data = encode_call(
            &self.inner.config.place_bet_function,
            &(U256::from(multiplier.get()),),
        );
        self.send_and_confirm(&self.inner.config.deployment.game, data, Some(value))
            .await
    }

    async fn subscribe(
        &self,
        sender: ResolutionSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        let head = self.block_number().await?;
        let from_block = self.resume_block(head).await?;
        info!(
            url = %self.inner.config.url,
            game = %self.inner.config.deployment.game,
            head,
            from_block,
            "Subscribed to BetResolved logs"
        );
        tokio::spawn(self.clone().run_subscription(from_block, sender, shutdown_rx));
        Ok(())
    }

    async fn force_resolve(&self, correlation_id: &CorrelationId) -> Result<(), GatewayError> {
        let request_id = correlation_id.to_uint().ok_or_else(|| {
            GatewayError::Malformed(format!("correlation id {correlation_id} is not a uint256"))
        })?;
        let consumer = parse_address(&self.inner.config.deployment.game)?;
        let data = encode_call(FULFILL_RANDOM_WORDS, &(request_id, consumer));
        let receipt = self
            .send_and_confirm(&self.inner.config.deployment.coordinator, data, None)
            .await?;
        debug!(%correlation_id, tx_hash = %receipt.tx_hash, "fulfillRandomWords mined");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use super::super::abi::to_hex;
    use crate::events::resolution_channel;
    use crate::processors::bet_submission::{BetSubmitter, SubmissionError};
    use alloy_primitives::Address;
    use alloy_sol_types::SolValue;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::Mutex;

    const GAME: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
    const PLAYER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const TX_HASH: &str = "0x9fc76417374aa880d4449a1f7f31ec597f00b1f6f3dd2d66f4c9c6c445836d8b";

    fn config(url: &str) -> JsonRpcLedgerConfig {
        JsonRpcLedgerConfig {
            url: url.parse().unwrap(),
            deployment: Deployment {
                game: GAME.to_string(),
                coordinator: "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512".to_string(),
            },
            from: None,
            poll_interval: Duration::from_millis(20),
            receipt_timeout: Duration::from_secs(1),
            place_bet_function: DEFAULT_PLACE_BET_FUNCTION.to_string(),
            bet_placed_event: DEFAULT_BET_PLACED_EVENT.to_string(),
            bet_resolved_event: DEFAULT_BET_RESOLVED_EVENT.to_string(),
            start_block: None,
            cursor_path: None,
        }
    }

    fn ledger(url: &str) -> JsonRpcLedger {
        JsonRpcLedger::new(config(url)).unwrap()
    }

    fn player() -> Address {
        parse_address(PLAYER).unwrap()
    }

    fn uint_topic(value: u64) -> String {
        to_hex(B256::from(U256::from(value)))
    }

    fn bet_resolved_log(request_id: u64, won: bool, payout: u128) -> RawLog {
        RawLog {
            address: GAME.to_string(),
            topics: vec![event_topic(DEFAULT_BET_RESOLVED_EVENT)],
            data: to_hex(
                (U256::from(request_id), player(), won, U256::from(payout)).abi_encode_params(),
            ),
        }
    }

    fn raw_log_json(log: &RawLog) -> Value {
        json!({ "address": log.address, "topics": log.topics, "data": log.data })
    }

    /// A development node that answers the handful of methods the gateway
    /// uses and records every request.
    struct FakeNode {
        head: u64,
        resolved_logs: Vec<Value>,
        receipt_status: &'static str,
        receipt_logs: Vec<Value>,
        requests: Mutex<Vec<Value>>,
    }

    impl FakeNode {
        fn new(head: u64) -> Self {
            Self {
                head,
                resolved_logs: vec![],
                receipt_status: "0x1",
                receipt_logs: vec![],
                requests: Mutex::new(vec![]),
            }
        }

        fn calls(&self, method: &str) -> Vec<Value> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r["method"] == method)
                .map(|r| r["params"].clone())
                .collect()
        }
    }

    async fn answer(State(node): State<Arc<FakeNode>>, Json(request): Json<Value>) -> Json<Value> {
        node.requests.lock().unwrap().push(request.clone());
        let result = match request["method"].as_str().unwrap_or_default() {
            "eth_accounts" => json!([PLAYER]),
            "eth_blockNumber" => json!(format_quantity(u128::from(node.head))),
            "eth_getLogs" => json!(node.resolved_logs),
            "eth_sendTransaction" => json!(TX_HASH),
            "eth_getTransactionReceipt" => json!({
                "transactionHash": TX_HASH,
                "status": node.receipt_status,
                "logs": node.receipt_logs,
            }),
            _ => {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "error": { "code": -32601, "message": "method not found" },
                }));
            }
        };
        Json(json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }))
    }

    async fn serve(node: Arc<FakeNode>) -> String {
        let router = Router::new().route("/", post(answer)).with_state(node);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn decodes_bet_placed_with_indexed_request_id() {
        let ledger = ledger("http://127.0.0.1:8545");
        let log = RawLog {
            address: GAME.to_uppercase().replacen("0X", "0x", 1),
            topics: vec![event_topic(DEFAULT_BET_PLACED_EVENT), uint_topic(42)],
            data: to_hex((player(), U256::from(100u64), U256::from(3u64)).abi_encode_params()),
        };
        assert_eq!(
            ledger.decode_log(&log).unwrap(),
            LedgerLog::BetPlaced {
                correlation_id: CorrelationId::from(42),
                player: PLAYER.to_string(),
            }
        );
    }

    #[test]
    fn decodes_bet_resolved() {
        let ledger = ledger("http://127.0.0.1:8545");
        assert_eq!(
            ledger
                .decode_log(&bet_resolved_log(7, true, 300_000_000_000_000_000))
                .unwrap(),
            LedgerLog::BetResolved(ResolutionEvent {
                correlation_id: CorrelationId::from(7),
                subject: PLAYER.to_string(),
                outcome: true,
                amount: WeiAmount::from_u128(300_000_000_000_000_000),
            })
        );
    }

    #[test]
    fn foreign_and_short_logs() {
        let ledger = ledger("http://127.0.0.1:8545");

        // Same topic from another contract is not ours.
        let foreign = RawLog {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            topics: vec![event_topic(DEFAULT_BET_PLACED_EVENT)],
            data: "0x".to_string(),
        };
        assert!(matches!(
            ledger.decode_log(&foreign).unwrap(),
            LedgerLog::Other { .. }
        ));

        let short = RawLog {
            address: GAME.to_string(),
            topics: vec![event_topic(DEFAULT_BET_PLACED_EVENT)],
            data: uint_topic(1),
        };
        assert!(matches!(
            ledger.decode_log(&short),
            Err(GatewayError::Malformed(_))
        ));
    }

    #[test]
    fn deployment_requires_both_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployed.json");

        assert!(matches!(
            Deployment::load(&path),
            Err(DeploymentError::Io { .. })
        ));

        std::fs::write(&path, r#"{ "GachaGame": "0x01" }"#).unwrap();
        assert!(matches!(
            Deployment::load(&path),
            Err(DeploymentError::Parse { .. })
        ));

        std::fs::write(
            &path,
            r#"{ "GachaGame": "0x01", "VRFCoordinatorV2Mock": "0x02" }"#,
        )
        .unwrap();
        let deployment = Deployment::load(&path).unwrap();
        assert_eq!(deployment.game, "0x01");
        assert_eq!(deployment.coordinator, "0x02");
    }

    #[tokio::test]
    async fn subscribe_fails_when_node_is_unreachable() {
        let ledger = ledger("http://127.0.0.1:1");
        let (tx, _rx) = resolution_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        assert!(matches!(
            ledger.subscribe(tx, shutdown_rx).await,
            Err(GatewayError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn polled_bet_resolved_reaches_the_channel() {
        let mut node = FakeNode::new(0x10);
        node.resolved_logs = vec![raw_log_json(&bet_resolved_log(5, false, 0))];
        let node = Arc::new(node);
        let ledger = ledger(&serve(node.clone()).await);

        let (tx, mut rx) = resolution_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        ledger.subscribe(tx, shutdown_rx).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.correlation_id, CorrelationId::from(5));
        assert_eq!(event.subject, PLAYER);
        assert!(!event.outcome);
        assert!(event.amount.is_zero());

        let filter = &node.calls("eth_getLogs")[0][0];
        assert_eq!(filter["fromBlock"], "0x11");
        assert_eq!(filter["address"], GAME);
        assert_eq!(filter["topics"][0], event_topic(DEFAULT_BET_RESOLVED_EVENT));
        shutdown_tx.send(true).unwrap();
    }

    #[tokio::test]
    async fn restart_resumes_from_saved_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let cursor_path = dir.path().join("bets.cursor.json");
        BlockCursor::new(&cursor_path).save(3).await.unwrap();

        let mut node = FakeNode::new(0x10);
        node.resolved_logs = vec![raw_log_json(&bet_resolved_log(9, true, 2))];
        let node = Arc::new(node);
        let mut config = config(&serve(node.clone()).await);
        config.cursor_path = Some(cursor_path.clone());
        config.start_block = Some(12);
        let ledger = JsonRpcLedger::new(config).unwrap();

        let (tx, mut rx) = resolution_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        ledger.subscribe(tx, shutdown_rx).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.correlation_id, CorrelationId::from(9));
        assert_eq!(node.calls("eth_getLogs")[0][0]["fromBlock"], "0x3");

        // The cursor keeps the start of the last scanned range. A third head
        // lookup means the first poll, cursor save included, has finished.
        tokio::time::timeout(Duration::from_secs(5), async {
            while node.calls("eth_blockNumber").len() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        shutdown_tx.send(true).unwrap();
        assert_eq!(BlockCursor::new(&cursor_path).load().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn start_block_applies_without_a_cursor() {
        let node = Arc::new(FakeNode::new(0x10));
        let mut config = config(&serve(node.clone()).await);
        config.start_block = Some(2);
        let ledger = JsonRpcLedger::new(config).unwrap();

        let (tx, _rx) = resolution_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        ledger.subscribe(tx, shutdown_rx).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while node.calls("eth_getLogs").is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(node.calls("eth_getLogs")[0][0]["fromBlock"], "0x2");
        shutdown_tx.send(true).unwrap();
    }

    #[tokio::test]
    async fn reverted_receipt_is_reported() {
        let mut node = FakeNode::new(1);
        node.receipt_status = "0x0";
        let node = Arc::new(node);
        let ledger = ledger(&serve(node.clone()).await);

        let result = ledger
            .place_bet(
                Multiplier::new(3).unwrap(),
                &WeiAmount::parse_ether("0.1").unwrap(),
            )
            .await;
        assert!(matches!(result, Err(GatewayError::Reverted { .. })));

        let sent = &node.calls("eth_sendTransaction")[0][0];
        assert_eq!(sent["from"], PLAYER);
        assert_eq!(sent["to"], GAME);
        assert_eq!(sent["value"], "0x16345785d8a0000");
        assert_eq!(
            sent["data"],
            encode_call(DEFAULT_PLACE_BET_FUNCTION, &(U256::from(3u64),))
        );
    }

    #[tokio::test]
    async fn receipt_without_bet_placed_fails_submission() {
        let mut node = FakeNode::new(1);
        node.receipt_logs = vec![json!({
            "address": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512",
            "topics": [event_topic("RandomWordsRequested(bytes32,uint256)")],
            "data": "0x",
        })];
        let node = Arc::new(node);
        let gateway: Arc<dyn LedgerGateway> = Arc::new(ledger(&serve(node).await));
        let submitter = BetSubmitter::new(gateway, Duration::from_secs(5), false);

        let result = submitter
            .submit_bet(
                Multiplier::new(2).unwrap(),
                &WeiAmount::parse_ether("1").unwrap(),
            )
            .await;
        match result {
            Err(SubmissionError::MissingBetPlaced { tx_hash }) => assert_eq!(tx_hash, TX_HASH),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn force_resolve_calls_the_coordinator() {
        let node = Arc::new(FakeNode::new(1));
        let ledger = ledger(&serve(node.clone()).await);

        ledger.force_resolve(&CorrelationId::from(12)).await.unwrap();
        assert!(matches!(
            ledger.force_resolve(&CorrelationId::from("abc")).await,
            Err(GatewayError::Malformed(_))
        ));

        let sent = node.calls("eth_sendTransaction");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0]["to"], "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512");
        assert_eq!(
            sent[0][0]["data"],
            encode_call(
                FULFILL_RANDOM_WORDS,
                &(U256::from(12u64), parse_address(GAME).unwrap())
            )
        );
    }
}
