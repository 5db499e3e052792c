//! Error types for the dice agent
//!
//! Two families: startup errors (`AgentError`) which are fatal and propagate
//! out of `main`, and per-event errors (`SettlementError`) which end a single
//! settlement and are logged by the worker.

use crate::amount::Amount;
use crate::coin_select::SelectionError;

/// Startup errors. Not caught.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("HMAC-SHA-512 unavailable: {0}")]
    CryptoUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node client setup failed: {0}")]
    ClientSetup(String),
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors that end one event's settlement
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("rpc {method} failed: {reason}")]
    Rpc { method: String, reason: String },

    #[error("malformed transaction {txid}: {reason}")]
    Parse { txid: String, reason: String },

    #[error("insufficient funds: {total} < {required}")]
    InsufficientFunds { total: Amount, required: Amount },

    #[error("signing incomplete for payout: {0}")]
    SignFailed(String),

    #[error("broadcast rejected: {0}")]
    BroadcastFailed(String),

    #[error("amount arithmetic overflowed: {0}")]
    Overflow(String),
}

impl SettlementError {
    pub fn rpc(method: &str, reason: impl ToString) -> Self {
        SettlementError::Rpc {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(txid: &str, reason: impl ToString) -> Self {
        SettlementError::Parse {
            txid: txid.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<SelectionError> for SettlementError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::InsufficientFunds { total, required } => {
                SettlementError::InsufficientFunds { total, required }
            }
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
pub type SettlementResult<T> = Result<T, SettlementError>;
