//! Fundamental types shared by every QUEST protocol crate.
//!
//! Identities, amounts, ids, categories, timestamps, and protocol
//! parameters. Cross-component references are always by id or address —
//! never by embedded pointer — so these types are the whole vocabulary
//! two components can use to talk about each other's state.

pub mod address;
pub mod amount;
pub mod asset;
pub mod category;
pub mod fault;
pub mod ids;
pub mod params;
pub mod score;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use asset::AssetId;
pub use category::{ProofCategory, TaskCategory};
pub use fault::FaultKind;
pub use ids::{RequestId, TaskId};
pub use params::{ProtocolParams, BPS_DENOMINATOR};
pub use score::RiskScore;
pub use time::{TaskWindow, Timestamp};
