//! JSON-RPC client for a bitcoind-style wallet node

use crate::amount::Amount;
use crate::config::NodeConfig;
use crate::errors::{AgentError, AgentResult, SettlementError, SettlementResult};
use crate::node::types::{
    ListUnspentEntry, OutputRef, RawTransaction, SignedTransaction, TxId, UnspentOutput, WalletTxSummary,
};
use crate::node::WalletNode;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcEnvelope<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Clone)]
enum RpcFailure {
    Transport(String),
    Http { status: StatusCode, body: String },
    InvalidJson { error: String, body: String },
    JsonRpc { code: i64, message: String },
    EmptyResult,
}

impl RpcFailure {
    fn summary(&self) -> String {
        match self {
            RpcFailure::Transport(message) => format!("transport_error={message}"),
            RpcFailure::Http { status, body } => format!("http_status={status} body={body}"),
            RpcFailure::InvalidJson { error, body } => format!("invalid_json_error={error} body={body}"),
            RpcFailure::JsonRpc { code, message } => format!("json_rpc_error code={code} message={message}"),
            RpcFailure::EmptyResult => "empty_result".to_string(),
        }
    }
}

/// HTTP JSON-RPC client with basic auth.
///
/// One `reqwest::Client` (and its connection pool) serves every call.
pub struct JsonRpcClient {
    http: Client,
    url: String,
    user: String,
    password: String,
    sign_method: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(config: &NodeConfig) -> AgentResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AgentError::ClientSetup(e.to_string()))?;

        Ok(Self {
            http,
            url: config.endpoint(),
            user: config.user.clone(),
            password: config.password.clone(),
            sign_method: config.sign_method.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> SettlementResult<T> {
        self.call_inner(method, params)
            .await
            .map_err(|failure| SettlementError::rpc(method, failure.summary()))
    }

    async fn call_inner<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!("rpc -> {} id={}", method, id);

        let resp = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&payload)
            .send()
            .await
            .map_err(|err| RpcFailure::Transport(err.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        // Node-side errors arrive with HTTP 500 and a JSON body.
        let envelope: JsonRpcEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => {
                return Err(RpcFailure::InvalidJson {
                    error: err.to_string(),
                    body,
                })
            }
            Err(_) => return Err(RpcFailure::Http { status, body }),
        };
        if let Some(err) = envelope.error {
            return Err(RpcFailure::JsonRpc {
                code: err.code,
                message: err.message,
            });
        }
        if !status.is_success() {
            return Err(RpcFailure::Http { status, body });
        }
        envelope.result.ok_or(RpcFailure::EmptyResult)
    }
}

fn outputs_object(outputs: &[(String, Amount)]) -> SettlementResult<serde_json::Map<String, serde_json::Value>> {
    let mut map = serde_json::Map::new();
    for (address, amount) in outputs {
        if map.insert(address.clone(), json!(amount)).is_some() {
            return Err(SettlementError::rpc(
                "createrawtransaction",
                format!("duplicate output address {}", address),
            ));
        }
    }
    Ok(map)
}

#[async_trait]
impl WalletNode for JsonRpcClient {
    async fn get_raw_transaction(&self, txid: &str, verbosity: u8) -> SettlementResult<RawTransaction> {
        let raw: serde_json::Value = self.call("getrawtransaction", json!([txid, verbosity])).await?;
        serde_json::from_value(raw).map_err(|e| SettlementError::parse(txid, e))
    }

    async fn list_unspent(&self) -> SettlementResult<Vec<UnspentOutput>> {
        let entries: Vec<ListUnspentEntry> = self.call("listunspent", json!([])).await?;
        let total = entries.len();
        let spendable: Vec<UnspentOutput> = entries
            .into_iter()
            .filter(|entry| entry.spendable)
            .map(UnspentOutput::from)
            .collect();
        if spendable.len() < total {
            tracing::debug!("listunspent: skipped {} watch-only outputs", total - spendable.len());
        }
        Ok(spendable)
    }

    async fn get_raw_change_address(&self) -> SettlementResult<String> {
        self.call("getrawchangeaddress", json!([])).await
    }

    async fn create_raw_transaction(
        &self,
        inputs: &[OutputRef],
        outputs: &[(String, Amount)],
    ) -> SettlementResult<String> {
        let outputs = outputs_object(outputs)?;
        self.call("createrawtransaction", json!([inputs, outputs])).await
    }

    async fn sign_raw_transaction(&self, hex: &str) -> SettlementResult<SignedTransaction> {
        self.call(&self.sign_method, json!([hex])).await
    }

    async fn send_raw_transaction(&self, hex: &str) -> SettlementResult<TxId> {
        self.call("sendrawtransaction", json!([hex])).await
    }

    async fn decode_raw_transaction(&self, hex: &str) -> SettlementResult<serde_json::Value> {
        self.call("decoderawtransaction", json!([hex])).await
    }

    async fn get_transaction(&self, txid: &str) -> SettlementResult<WalletTxSummary> {
        self.call("gettransaction", json!([txid])).await
    }
}
