//! In-memory wallet node shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dicebot::constants::HOUSE_ADDRESS;
use dicebot::node::{
    OutputRef, RawInput, RawOutput, RawTransaction, SignedTransaction, TxId, UnspentOutput, WalletNode,
    WalletTxSummary,
};
use dicebot::{Amount, DiceRoller, SettlementEngine, SettlementError, SettlementPolicy, SettlementResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SECRET: &str = "293d5d2ddd365f54759283a8097ab2640cbe6f8864adc2b1b31e65c14c999f04";

/// Bet at vout 1 that wins (roll 29514)
pub const WIN_TXID: &str = "d4735e3a265e16eee03f59718b9b5d03019c07d8b6c51f90da3a666eec13ab35";
/// Bet at vout 1 that loses (roll 42581)
pub const LOSS_TXID: &str = "5feceb66ffc86f38d952786c6d696c79c2dbc239dd4e91b46729d73a27fb57e9";
/// Another losing bet at vout 1 (roll 41427)
pub const LOSS_TXID_2: &str = "6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b";
/// Bet at vout 0 that wins (roll 16881)
pub const WIN_TXID_VOUT0: &str = "44ba554e17977b31413d531e0aa4e02e87a7a38115d3be3b33c95f85fac2a4f7";

pub const PARENT_TXID: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const WALLET_UTXO_TXID: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const BETTOR: &str = "bchreg:qbettor";
pub const CHANGE: &str = "bchreg:qchange";
pub const PAYOUT_TXID: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

pub fn coins(sats: u64) -> Amount {
    Amount::from_sat(sats)
}

/// Transaction paying `amount` to the house at `vout`, funded by `funding`.
/// Lower outputs pay someone else.
pub fn bet_tx(txid: &str, vout: u32, amount: Amount, funding: Option<OutputRef>) -> RawTransaction {
    let mut outputs: Vec<RawOutput> = (0..vout)
        .map(|n| RawOutput::new(n, coins(5_000), vec!["bchreg:qsomeoneelse".to_string()]))
        .collect();
    outputs.push(RawOutput::new(vout, amount, vec![HOUSE_ADDRESS.to_string()]));

    RawTransaction {
        txid: txid.to_string(),
        vin: funding.map(RawInput::spending).into_iter().collect(),
        vout: outputs,
    }
}

pub fn funding_tx(txid: &str, vout: u32, address: &str) -> RawTransaction {
    RawTransaction {
        txid: txid.to_string(),
        vin: vec![],
        vout: vec![RawOutput::new(vout, coins(10_000_000), vec![address.to_string()])],
    }
}

/// Wallet node double that records every call
pub struct FakeWalletNode {
    transactions: Mutex<HashMap<TxId, RawTransaction>>,
    unspent: Mutex<Vec<UnspentOutput>>,
    sign_complete: Mutex<bool>,
    broadcast_error: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<(Vec<OutputRef>, Vec<(String, Amount)>)>>,
    sent: Mutex<Vec<String>>,
    fetched: Mutex<Vec<TxId>>,
    summary_delays: Mutex<HashMap<TxId, Duration>>,
    broadcast_delay: Mutex<Duration>,
}

impl FakeWalletNode {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            unspent: Mutex::new(Vec::new()),
            sign_complete: Mutex::new(true),
            broadcast_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            summary_delays: Mutex::new(HashMap::new()),
            broadcast_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn with_transaction(self, tx: RawTransaction) -> Self {
        self.transactions.lock().unwrap().insert(tx.txid.clone(), tx);
        self
    }

    pub fn with_unspent(self, txid: &str, vout: u32, amount: Amount) -> Self {
        self.unspent
            .lock()
            .unwrap()
            .push(UnspentOutput::new(OutputRef::new(txid, vout), amount));
        self
    }

    pub fn failing_signature(self) -> Self {
        *self.sign_complete.lock().unwrap() = false;
        self
    }

    pub fn rejecting_broadcast(self, reason: &str) -> Self {
        *self.broadcast_error.lock().unwrap() = Some(reason.to_string());
        self
    }

    /// `gettransaction` for `txid` answers only after `delay`.
    pub fn slow_summary(self, txid: &str, delay: Duration) -> Self {
        self.summary_delays.lock().unwrap().insert(txid.to_string(), delay);
        self
    }

    /// `sendrawtransaction` answers only after `delay`.
    pub fn slow_broadcast(self, delay: Duration) -> Self {
        *self.broadcast_delay.lock().unwrap() = delay;
        self
    }

    /// Txids passed to `getrawtransaction`, in call order
    pub fn fetched(&self) -> Vec<TxId> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(Vec<OutputRef>, Vec<(String, Amount)>)> {
        self.created.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, method: &str) {
        self.calls.lock().unwrap().push(method.to_string());
    }
}

#[async_trait]
impl WalletNode for FakeWalletNode {
    async fn get_raw_transaction(&self, txid: &str, _verbosity: u8) -> SettlementResult<RawTransaction> {
        self.record("getrawtransaction");
        self.fetched.lock().unwrap().push(txid.to_string());
        self.transactions
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or_else(|| SettlementError::rpc("getrawtransaction", "No such mempool or blockchain transaction"))
    }

    async fn list_unspent(&self) -> SettlementResult<Vec<UnspentOutput>> {
        self.record("listunspent");
        Ok(self.unspent.lock().unwrap().clone())
    }

    async fn get_raw_change_address(&self) -> SettlementResult<String> {
        self.record("getrawchangeaddress");
        Ok(CHANGE.to_string())
    }

    async fn create_raw_transaction(
        &self,
        inputs: &[OutputRef],
        outputs: &[(String, Amount)],
    ) -> SettlementResult<String> {
        self.record("createrawtransaction");
        self.created.lock().unwrap().push((inputs.to_vec(), outputs.to_vec()));
        Ok("0200unsigned".to_string())
    }

    async fn sign_raw_transaction(&self, hex: &str) -> SettlementResult<SignedTransaction> {
        self.record("signrawtransactionwithwallet");
        let complete = *self.sign_complete.lock().unwrap();
        Ok(SignedTransaction {
            hex: format!("{}signed", hex),
            complete,
            errors: if complete {
                vec![]
            } else {
                vec![serde_json::json!({"error": "Input not found or already spent"})]
            },
        })
    }

    async fn send_raw_transaction(&self, hex: &str) -> SettlementResult<TxId> {
        self.record("sendrawtransaction");
        let delay = *self.broadcast_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if let Some(reason) = self.broadcast_error.lock().unwrap().clone() {
            return Err(SettlementError::rpc("sendrawtransaction", reason));
        }
        self.sent.lock().unwrap().push(hex.to_string());
        Ok(PAYOUT_TXID.to_string())
    }

    async fn decode_raw_transaction(&self, hex: &str) -> SettlementResult<serde_json::Value> {
        self.record("decoderawtransaction");
        Ok(serde_json::json!({ "hex": hex }))
    }

    async fn get_transaction(&self, txid: &str) -> SettlementResult<WalletTxSummary> {
        self.record("gettransaction");
        let delay = self.summary_delays.lock().unwrap().get(txid).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Err(SettlementError::rpc("gettransaction", format!("Invalid or non-wallet transaction id {}", txid)))
    }
}

/// Node set up for the standard winning bet: 0.01 at vout 1, a 0.02 wallet
/// output to cover the payout, and the bet output itself in the wallet.
pub fn winning_bet_node() -> FakeWalletNode {
    FakeWalletNode::new()
        .with_transaction(bet_tx(WIN_TXID, 1, coins(1_000_000), Some(OutputRef::new(PARENT_TXID, 0))))
        .with_transaction(funding_tx(PARENT_TXID, 0, BETTOR))
        .with_unspent(WIN_TXID, 1, coins(1_000_000))
        .with_unspent(WALLET_UTXO_TXID, 0, coins(2_000_000))
}

pub fn engine(node: Arc<FakeWalletNode>) -> SettlementEngine<FakeWalletNode> {
    let dice = DiceRoller::new(SECRET).unwrap();
    SettlementEngine::new(node, dice, SettlementPolicy::default())
}
