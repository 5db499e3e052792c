//! Largest-first coin selection
//!
//! Picks unspent outputs in descending amount order until they cover the
//! required amount. This keeps the input count low in the common case at the
//! cost of sometimes leaving more change than an exact-subset search would.

use crate::amount::Amount;
use crate::node::{OutputRef, UnspentOutput};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("insufficient funds: {total} < {required}")]
    InsufficientFunds { total: Amount, required: Amount },
}

/// Inputs chosen to cover a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub chosen: Vec<UnspentOutput>,
    pub total: Amount,
    pub change: Amount,
}

impl Selection {
    pub fn outpoints(&self) -> Vec<OutputRef> {
        self.chosen.iter().map(|utxo| utxo.outpoint.clone()).collect()
    }
}

pub fn select_coins(pool: &[UnspentOutput], required: Amount) -> Result<Selection, SelectionError> {
    let mut sorted: Vec<&UnspentOutput> = pool.iter().collect();
    // Ties broken by (txid, vout) so the result does not depend on pool order.
    sorted.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.outpoint.txid.cmp(&b.outpoint.txid))
            .then_with(|| a.outpoint.vout.cmp(&b.outpoint.vout))
    });

    let mut chosen = Vec::new();
    let mut total = Amount::ZERO;
    for utxo in sorted {
        chosen.push(utxo.clone());
        total = total.saturating_add(utxo.amount);
        if total >= required {
            let change = total.checked_sub(required).unwrap_or(Amount::ZERO);
            return Ok(Selection { chosen, total, change });
        }
    }

    Err(SelectionError::InsufficientFunds { total, required })
}
