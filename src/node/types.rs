//! Wallet node data types as decoded from JSON-RPC

use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction id, hex as the node prints it
pub type TxId = String;

/// One spendable output: `(txid, vout)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputRef {
    pub txid: TxId,
    pub vout: u32,
}

impl OutputRef {
    pub fn new(txid: impl Into<String>, vout: u32) -> Self {
        Self {
            txid: txid.into(),
            vout,
        }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub outpoint: OutputRef,
    pub amount: Amount,
}

impl UnspentOutput {
    pub fn new(outpoint: OutputRef, amount: Amount) -> Self {
        Self { outpoint, amount }
    }
}

/// `listunspent` entry
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListUnspentEntry {
    pub txid: TxId,
    pub vout: u32,
    pub amount: Amount,
    #[serde(default = "default_spendable")]
    pub spendable: bool,
}

fn default_spendable() -> bool {
    true
}

impl From<ListUnspentEntry> for UnspentOutput {
    fn from(entry: ListUnspentEntry) -> Self {
        UnspentOutput::new(OutputRef::new(entry.txid, entry.vout), entry.amount)
    }
}

/// Transaction input. Coinbase inputs have no previous output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<TxId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
}

impl RawInput {
    pub fn spending(outpoint: OutputRef) -> Self {
        Self {
            txid: Some(outpoint.txid),
            vout: Some(outpoint.vout),
            coinbase: None,
        }
    }

    pub fn previous_output(&self) -> Option<OutputRef> {
        match (&self.txid, self.vout) {
            (Some(txid), Some(vout)) => Some(OutputRef::new(txid.clone(), vout)),
            _ => None,
        }
    }
}

/// Transaction output with its destination addresses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawOutputWire")]
pub struct RawOutput {
    pub n: u32,
    pub value: Amount,
    pub addresses: Vec<String>,
}

impl RawOutput {
    pub fn new(n: u32, value: Amount, addresses: Vec<String>) -> Self {
        Self { n, value, addresses }
    }

    pub fn pays_to(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a == address)
    }
}

#[derive(Deserialize)]
struct RawOutputWire {
    value: Amount,
    n: u32,
    #[serde(rename = "scriptPubKey", default)]
    script_pub_key: ScriptPubKeyWire,
}

/// Older nodes report `addresses: [..]`, newer ones a single `address`.
#[derive(Default, Deserialize)]
struct ScriptPubKeyWire {
    #[serde(default)]
    addresses: Vec<String>,
    #[serde(default)]
    address: Option<String>,
}

impl From<RawOutputWire> for RawOutput {
    fn from(wire: RawOutputWire) -> Self {
        let mut addresses = wire.script_pub_key.addresses;
        if let Some(address) = wire.script_pub_key.address {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        RawOutput {
            n: wire.n,
            value: wire.value,
            addresses,
        }
    }
}

/// Decoded transaction (`getrawtransaction <txid> 1`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTransaction {
    pub txid: TxId,
    #[serde(default)]
    pub vin: Vec<RawInput>,
    #[serde(default)]
    pub vout: Vec<RawOutput>,
}

impl RawTransaction {
    pub fn output(&self, vout: u32) -> Option<&RawOutput> {
        self.vout.iter().find(|out| out.n == vout)
    }
}

/// Result of the signing RPC
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
    pub complete: bool,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// Wallet view of a transaction (`gettransaction`), attached to events
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WalletTxSummary {
    pub txid: TxId,
    /// Net effect on the wallet; negative for sends, so kept as the node's number.
    pub amount: serde_json::Number,
    #[serde(default)]
    pub confirmations: i64,
    #[serde(default)]
    pub time: Option<i64>,
}

/// A wallet transaction notification, as delivered by the node
#[derive(Debug, Clone)]
pub struct WalletEvent {
    pub txid: TxId,
    pub received_at: DateTime<Utc>,
}

impl WalletEvent {
    pub fn new(txid: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            received_at: Utc::now(),
        }
    }
}
