//! Fixed-point coin amounts
//!
//! Amounts are whole satoshis held in a `u64`. The node speaks decimal coins
//! (`0.01`), so parsing works on the decimal text directly and formatting
//! always writes eight fractional digits. No value ever passes through `f64`.

use crate::constants::SATS_PER_COIN;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const DECIMALS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("negative amount: {0}")]
    Negative(String),

    #[error("malformed amount: {0}")]
    Malformed(String),

    #[error("amount {0} has more than 8 significant decimals")]
    TooPrecise(String),

    #[error("amount {0} overflows")]
    Overflow(String),
}

/// Non-negative coin amount in satoshis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_sat(sats: u64) -> Self {
        Amount(sats)
    }

    pub const fn to_sat(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Multiply by `numerator / denominator`, truncating to whole satoshis.
    pub fn checked_mul_ratio(self, numerator: u64, denominator: u64) -> Option<Amount> {
        if denominator == 0 {
            return None;
        }
        let scaled = (self.0 as u128).checked_mul(numerator as u128)? / denominator as u128;
        u64::try_from(scaled).ok().map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / SATS_PER_COIN,
            self.0 % SATS_PER_COIN,
            width = DECIMALS
        )
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        if trimmed.starts_with('-') {
            return Err(AmountError::Negative(trimmed.to_string()));
        }
        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountError::Malformed(trimmed.to_string()));
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(AmountError::Malformed(trimmed.to_string()));
        }

        // Trailing zeros past the eighth decimal carry no value.
        let (kept, dropped) = fraction.split_at(fraction.len().min(DECIMALS));
        if dropped.bytes().any(|b| b != b'0') {
            return Err(AmountError::TooPrecise(trimmed.to_string()));
        }

        let overflow = || AmountError::Overflow(trimmed.to_string());
        let whole_sats = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u64>()
                .map_err(|_| overflow())?
                .checked_mul(SATS_PER_COIN)
                .ok_or_else(overflow)?
        };
        let fraction_sats = if kept.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", kept, width = DECIMALS);
            padded.parse::<u64>().map_err(|_| overflow())?
        };

        whole_sats
            .checked_add(fraction_sats)
            .map(Amount)
            .ok_or_else(overflow)
    }
}

/// Written as a decimal string; the node accepts strings wherever it takes amounts.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::String(text) => text,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a decimal amount, got {}",
                    other
                )))
            }
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}
