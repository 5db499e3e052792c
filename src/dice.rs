//! Dice rolls derived from HMAC-SHA-512
//!
//! A roll is the first two bytes of `HMAC-SHA-512(secret, value)` read as a
//! big-endian `u16`. The value is the bet's txid followed by its vout, so the
//! outcome is fixed by the transaction and can be audited once the secret is
//! disclosed.

use crate::errors::{AgentError, AgentResult};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// A roll together with the digest it was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub value: u16,
    pub digest_hex: String,
}

/// HMAC keyed once with the server secret
#[derive(Clone)]
pub struct DiceRoller {
    keyed: HmacSha512,
}

impl DiceRoller {
    pub fn new(secret: &str) -> AgentResult<Self> {
        let keyed = HmacSha512::new_from_slice(secret.as_bytes())
            .map_err(|e| AgentError::CryptoUnavailable(e.to_string()))?;
        Ok(Self { keyed })
    }

    pub fn roll(&self, value: &str) -> u16 {
        self.roll_with_digest(value).value
    }

    pub fn roll_with_digest(&self, value: &str) -> DiceRoll {
        let mut mac = self.keyed.clone();
        mac.update(value.as_bytes());
        let digest = mac.finalize().into_bytes();

        DiceRoll {
            value: u16::from_be_bytes([digest[0], digest[1]]),
            digest_hex: hex::encode(digest),
        }
    }

    /// Roll for the bet output `vout` of `txid`.
    pub fn roll_bet(&self, txid: &str, vout: u32) -> DiceRoll {
        self.roll_with_digest(&bet_seed(txid, vout))
    }
}

impl std::fmt::Debug for DiceRoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DiceRoller { .. }")
    }
}

/// One-shot roll. Keys a fresh HMAC on every call.
pub fn roll(value: &str, secret: &str) -> AgentResult<u16> {
    Ok(DiceRoller::new(secret)?.roll(value))
}

/// Txid as received, then the vout in base 10, no separator.
pub fn bet_seed(txid: &str, vout: u32) -> String {
    format!("{}{}", txid, vout)
}
