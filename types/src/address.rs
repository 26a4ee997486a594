//! Account address type with `qst_` prefix.
//!
//! Participants, advertisers, verifiers, referrers, and the platform
//! treasury are all identified by the same opaque address type. The
//! protocol never inspects what is behind an address — authorization is
//! done by comparing addresses against stored capability tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A QUEST account address, always prefixed with `qst_`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// The standard prefix for all QUEST addresses.
    pub const PREFIX: &'static str = "qst_";

    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `qst_`. Use [`Address::parse`]
    /// for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(s.starts_with(Self::PREFIX), "address must start with qst_");
        Self(s)
    }

    /// Parse an address from untrusted input (config files, wire payloads).
    pub fn parse(raw: impl Into<String>) -> Result<Self, AddressParseError> {
        let s = raw.into();
        if !s.starts_with(Self::PREFIX) || s.len() <= Self::PREFIX.len() {
            return Err(AddressParseError(s));
        }
        Ok(Self(s))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        self.0.starts_with(Self::PREFIX) && self.0.len() > Self::PREFIX.len()
    }
}

/// Error returned by [`Address::parse`] for malformed input.
#[derive(Debug, thiserror::Error)]
#[error("malformed address: {0:?} (expected qst_ prefix)")]
pub struct AddressParseError(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_prefixed_address() {
        let addr = Address::new("qst_alice");
        assert_eq!(addr.as_str(), "qst_alice");
        assert!(addr.is_valid());
    }

    #[test]
    #[should_panic(expected = "must start with qst_")]
    fn new_rejects_unprefixed_address() {
        Address::new("alice");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(Address::parse("alice").is_err());
        assert!(Address::parse("qst_").is_err());
        assert!(Address::parse("qst_bob").is_ok());
    }

    #[test]
    fn display_shows_raw_string() {
        let addr = Address::new("qst_carol");
        assert_eq!(format!("{addr}"), "qst_carol");
    }
}
