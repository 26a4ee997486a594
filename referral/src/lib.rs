//! Referral ledger.
//!
//! Owns referrer registration, the per-participant referral chain, and
//! cumulative-earnings bookkeeping. A participant's chain is frozen
//! permanently at first registration — it is walked once, stored, and
//! never rebuilt, so later re-registrations by upstream referrers cannot
//! retroactively change who earns from whom.

pub mod code;
pub mod error;
pub mod ledger;

pub use code::ReferralCode;
pub use error::ReferralError;
pub use ledger::{EarningRole, LedgerSnapshot, PayoutChain, ReferralLedger, ReferralRecord};
