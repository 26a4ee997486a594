//! Settlement engine.
//!
//! Splits a gross task reward across the participant, up to three tiers of
//! referrers, and the platform, with integer-exact arithmetic: for every
//! settlement the four shares sum to the gross amount — no value created,
//! none destroyed, every rounding remainder accounted to the platform
//! bucket. Executes the resulting transfers against per-asset pool and
//! account balances, and emits one audit record per settlement.

pub mod audit;
pub mod distribution;
pub mod engine;
pub mod error;

pub use audit::{PayoutRole, SettlementRecord, Transfer};
pub use distribution::Distribution;
pub use engine::{EngineSnapshot, Obligation, SettlementEngine};
pub use error::SettlementError;
