//! Referral codes and their derivation.
//!
//! A code is derived deterministically from the referrer's address: the
//! first [`CODE_BYTES`] bytes of Blake2b-256 over the address string,
//! hex-encoded, with a `ref` prefix. Deterministic derivation means a
//! referrer can hand out their code before ever touching the ledger; the
//! mapping only becomes resolvable once [`crate::ReferralLedger::issue_code`]
//! records it.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use quest_types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// Number of digest bytes kept in a code. 10 bytes = 80 bits, enough that
/// accidental collisions are not a practical concern; deliberate ones are
/// rejected at issuance.
pub const CODE_BYTES: usize = 10;

/// The prefix every referral code carries.
pub const CODE_PREFIX: &str = "ref";

/// A referrer's shareable code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Derive the canonical code for an address.
    pub fn derive(address: &Address) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update(address.as_str().as_bytes());
        let digest = hasher.finalize();
        Self(format!("{}{}", CODE_PREFIX, hex::encode(&digest[..CODE_BYTES])))
    }

    /// Wrap a raw code string (e.g. parsed from a request payload).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string has the canonical shape: `ref` + hex digest.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == CODE_PREFIX.len() + CODE_BYTES * 2
            && self.0.starts_with(CODE_PREFIX)
            && self.0[CODE_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
