//! Sybil risk score.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 0–100 confidence measure that a participant is not a duplicate or
/// automated identity. Higher is more trustworthy. Supplied by the
/// verifier alongside its verdict; gates settlement against the task's
/// minimum acceptable score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RiskScore(u8);

impl RiskScore {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(100);

    /// Construct a score, rejecting values above 100.
    pub fn new(value: u8) -> Option<Self> {
        if value <= 100 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_enforced() {
        assert!(RiskScore::new(0).is_some());
        assert!(RiskScore::new(100).is_some());
        assert!(RiskScore::new(101).is_none());
        assert!(RiskScore::new(255).is_none());
    }

    #[test]
    fn ordering_follows_value() {
        assert!(RiskScore::new(40).unwrap() < RiskScore::new(50).unwrap());
    }
}
