//! Wallet node access
//!
//! `WalletNode` is the seam between the settlement pipeline and the full node.
//! The JSON-RPC client talks to a real node; tests supply in-memory fakes.

pub mod client;
pub mod notify;
pub mod types;

pub use client::JsonRpcClient;
pub use notify::{Subscription, WalletNotifyListener};
pub use types::*;

use crate::amount::Amount;
use crate::errors::SettlementResult;
use async_trait::async_trait;

/// Wallet RPCs used by the agent
#[async_trait]
pub trait WalletNode: Send + Sync {
    /// Decoded transaction, with output addresses
    async fn get_raw_transaction(&self, txid: &str, verbosity: u8) -> SettlementResult<RawTransaction>;

    /// Spendable outputs of the controlled wallet
    async fn list_unspent(&self) -> SettlementResult<Vec<UnspentOutput>>;

    /// Fresh wallet-owned address for change
    async fn get_raw_change_address(&self) -> SettlementResult<String>;

    /// Unsigned transaction hex. Outputs are `(address, amount)` pairs.
    async fn create_raw_transaction(
        &self,
        inputs: &[OutputRef],
        outputs: &[(String, Amount)],
    ) -> SettlementResult<String>;

    async fn sign_raw_transaction(&self, hex: &str) -> SettlementResult<SignedTransaction>;

    /// Broadcast; returns the id of the accepted transaction
    async fn send_raw_transaction(&self, hex: &str) -> SettlementResult<TxId>;

    /// Decoded form of a raw transaction, for diagnostics
    async fn decode_raw_transaction(&self, hex: &str) -> SettlementResult<serde_json::Value>;

    /// Wallet summary of a transaction
    async fn get_transaction(&self, txid: &str) -> SettlementResult<WalletTxSummary>;
}
