//! Bet settlement
//!
//! One call to [`SettlementEngine::settle`] handles one wallet event from
//! start to finish:
//!
//! ```text
//! Observed(txid) -> Fetched(tx) -> BetIdentified(amount, vout) -> Win -> Settled(payout txid)
//!                         \                     \
//!                          Ignored               Loss
//! ```
//!
//! Any error along the way ends the event as `Failed(reason)`. Nothing is
//! carried from one event to the next, and each event broadcasts at most one
//! transaction.

use crate::amount::Amount;
use crate::bet::{parse_bet, BetEvent};
use crate::coin_select::select_coins;
use crate::constants::{
    HOUSE_ADDRESS, PER_BYTE_RATE_SATS, RAW_TX_VERBOSITY, TX_SIZE_BYTES, WIN_MAX, WIN_MULTIPLIER_DENOMINATOR,
    WIN_MULTIPLIER_NUMERATOR,
};
use crate::dice::DiceRoller;
use crate::errors::{SettlementError, SettlementResult};
use crate::node::{OutputRef, RawTransaction, TxId, WalletNode, WalletTxSummary};
use std::fmt;
use std::sync::Arc;

pub const NOT_A_BET: &str = "not a betting tx";
pub const NO_SENDER_ADDRESS: &str = "no sender address";

/// Payout rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPolicy {
    pub house_address: String,
    pub win_max: u16,
    pub multiplier_numerator: u64,
    pub multiplier_denominator: u64,
    pub fee: Amount,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            house_address: HOUSE_ADDRESS.to_string(),
            win_max: WIN_MAX,
            multiplier_numerator: WIN_MULTIPLIER_NUMERATOR,
            multiplier_denominator: WIN_MULTIPLIER_DENOMINATOR,
            fee: Amount::from_sat(TX_SIZE_BYTES * PER_BYTE_RATE_SATS),
        }
    }
}

impl SettlementPolicy {
    pub fn with_house_address(mut self, address: impl Into<String>) -> Self {
        self.house_address = address.into();
        self
    }

    pub fn is_win(&self, roll: u16) -> bool {
        roll < self.win_max
    }

    pub fn payout_for(&self, bet: Amount) -> Option<Amount> {
        bet.checked_mul_ratio(self.multiplier_numerator, self.multiplier_denominator)
    }
}

/// Everything needed to build the payout transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPlan {
    pub bettor_address: String,
    pub payout: Amount,
    /// Bet output first, then the selected wallet outputs
    pub inputs: Vec<OutputRef>,
    pub input_total: Amount,
    pub change_address: String,
    pub change: Amount,
    pub fee: Amount,
}

impl PayoutPlan {
    /// Destination outputs. A zero change output would be dust, so it is left out.
    pub fn outputs(&self) -> Vec<(String, Amount)> {
        let mut outputs = vec![(self.bettor_address.clone(), self.payout)];
        if !self.change.is_zero() {
            outputs.push((self.change_address.clone(), self.change));
        }
        outputs
    }

    /// `inputs = payout + change + fee`
    pub fn is_balanced(&self) -> bool {
        self.payout
            .checked_add(self.change)
            .and_then(|sum| sum.checked_add(self.fee))
            .map(|sum| sum == self.input_total)
            .unwrap_or(false)
    }
}

/// Terminal state of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { txid: TxId, plan: PayoutPlan },
    Loss { roll: u16 },
    Ignored(String),
    Failed(String),
}

impl fmt::Display for SettlementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementOutcome::Settled { txid, plan } => {
                write!(f, "Settled({}, paid {} to {})", txid, plan.payout, plan.bettor_address)
            }
            SettlementOutcome::Loss { roll } => write!(f, "Loss(roll {})", roll),
            SettlementOutcome::Ignored(reason) => write!(f, "Ignored({})", reason),
            SettlementOutcome::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// Runs the settlement state machine against a wallet node
pub struct SettlementEngine<N> {
    node: Arc<N>,
    dice: DiceRoller,
    policy: SettlementPolicy,
}

impl<N: WalletNode> SettlementEngine<N> {
    pub fn new(node: Arc<N>, dice: DiceRoller, policy: SettlementPolicy) -> Self {
        Self { node, dice, policy }
    }

    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Wallet view of `txid` for the event log. A failed lookup is logged and
    /// does not stop the event.
    pub async fn wallet_summary(&self, txid: &str) -> Option<WalletTxSummary> {
        match self.node.get_transaction(txid).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("No wallet summary for {}: {}", txid, e);
                None
            }
        }
    }

    /// Settle the wallet transaction `txid`. Never fails: errors become `Failed`.
    pub async fn settle(&self, txid: &str) -> SettlementOutcome {
        match self.run(txid).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Tx {} settlement failed: {}", txid, e);
                SettlementOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run(&self, txid: &str) -> SettlementResult<SettlementOutcome> {
        let tx = self.node.get_raw_transaction(txid, RAW_TX_VERBOSITY).await?;

        let Some(bet) = parse_bet(&tx.vout, &self.policy.house_address) else {
            tracing::info!("Tx {}: not a betting tx", txid);
            return Ok(SettlementOutcome::Ignored(NOT_A_BET.to_string()));
        };
        tracing::info!("Bet received: tx {}, amount {}, vout {}", tx.txid, bet.amount, bet.vout);

        let roll = self.dice.roll_bet(&tx.txid, bet.vout);
        tracing::debug!("Tx {} hmac {}", tx.txid, roll.digest_hex);
        if !self.policy.is_win(roll.value) {
            tracing::info!("Tx {} loss: roll {} >= {}", tx.txid, roll.value, self.policy.win_max);
            return Ok(SettlementOutcome::Loss { roll: roll.value });
        }
        tracing::info!("Tx {} win: roll {} < {}", tx.txid, roll.value, self.policy.win_max);

        let Some(bettor_address) = self.resolve_bettor(&tx).await? else {
            tracing::warn!("Tx {}: {}", tx.txid, NO_SENDER_ADDRESS);
            return Ok(SettlementOutcome::Failed(NO_SENDER_ADDRESS.to_string()));
        };
        tracing::info!("Tx {} sender address: {}", tx.txid, bettor_address);

        let plan = self.plan_payout(&tx, bet, bettor_address).await?;
        let payout_txid = self.broadcast(&plan).await?;
        tracing::info!("Tx sent: {} (pays {} for bet {})", payout_txid, plan.payout, tx.txid);

        Ok(SettlementOutcome::Settled {
            txid: payout_txid,
            plan,
        })
    }

    /// Address that funded the bet's first input.
    ///
    /// First-input heuristic: the bettor is assumed to be whoever owned the
    /// output spent by input 0. Transactions with several funders pay back to
    /// that first one only. Do not swap this for another heuristic without
    /// changing who gets paid.
    async fn resolve_bettor(&self, tx: &RawTransaction) -> SettlementResult<Option<String>> {
        let Some(funding) = tx.vin.first().and_then(|input| input.previous_output()) else {
            return Ok(None);
        };
        tracing::debug!("Tx {} first input spends {}", tx.txid, funding);

        let parent = self.node.get_raw_transaction(&funding.txid, RAW_TX_VERBOSITY).await?;
        Ok(parent
            .output(funding.vout)
            .and_then(|out| out.addresses.first())
            .cloned())
    }

    async fn plan_payout(&self, tx: &RawTransaction, bet: BetEvent, bettor_address: String) -> SettlementResult<PayoutPlan> {
        let fee = self.policy.fee;
        let payout = self
            .policy
            .payout_for(bet.amount)
            .ok_or_else(|| SettlementError::Overflow(format!("payout for {}", bet.amount)))?;
        // The bet output is spent too, so the wallet only tops up the difference.
        let required = payout
            .checked_sub(bet.amount)
            .and_then(|topup| topup.checked_add(fee))
            .ok_or_else(|| SettlementError::Overflow(format!("top-up for payout {}", payout)))?;

        let bet_outpoint = OutputRef::new(tx.txid.clone(), bet.vout);
        let pool: Vec<_> = self
            .node
            .list_unspent()
            .await?
            .into_iter()
            .filter(|utxo| utxo.outpoint != bet_outpoint)
            .collect();

        let selection = select_coins(&pool, required)?;
        tracing::debug!(
            "Tx {} selected {} inputs totalling {} for {} (change {})",
            tx.txid,
            selection.chosen.len(),
            selection.total,
            required,
            selection.change
        );

        let mut inputs = vec![bet_outpoint];
        inputs.extend(selection.outpoints());
        let input_total = selection
            .total
            .checked_add(bet.amount)
            .ok_or_else(|| SettlementError::Overflow("input total".to_string()))?;

        let change_address = self.node.get_raw_change_address().await?;

        Ok(PayoutPlan {
            bettor_address,
            payout,
            inputs,
            input_total,
            change_address,
            change: selection.change,
            fee,
        })
    }

    async fn broadcast(&self, plan: &PayoutPlan) -> SettlementResult<TxId> {
        let unsigned = self.node.create_raw_transaction(&plan.inputs, &plan.outputs()).await?;

        let signed = self.node.sign_raw_transaction(&unsigned).await?;
        if !signed.complete {
            let errors = serde_json::to_string(&signed.errors).unwrap_or_default();
            return Err(SettlementError::SignFailed(errors));
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            self.log_decoded(&signed.hex).await;
        }

        self.node
            .send_raw_transaction(&signed.hex)
            .await
            .map_err(|e| SettlementError::BroadcastFailed(e.to_string()))
    }

    async fn log_decoded(&self, hex: &str) {
        match self.node.decode_raw_transaction(hex).await {
            Ok(decoded) => match serde_json::to_string_pretty(&decoded) {
                Ok(pretty) => tracing::debug!("Payout transaction:\n{}", pretty),
                Err(e) => tracing::debug!("Payout transaction not printable: {}", e),
            },
            Err(e) => tracing::debug!("Payout transaction not decodable: {}", e),
        }
    }
}
