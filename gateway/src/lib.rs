//! Verification gateway.
//!
//! Brokers completion proofs to registered external verifiers and takes
//! their verdicts back in. The gateway is the system's one genuinely
//! asynchronous boundary: proof dispatch is fire-and-forget, verdicts may
//! arrive after arbitrary delay or never, and the gateway is the single
//! point where a replayed or forged delivery must be caught — verdict
//! intake is authorized against the live verifier capability table and a
//! per-verifier monotonic nonce, and a processed request never accepts a
//! second delivery.

pub mod engine;
pub mod error;
pub mod request;
pub mod scoring;
pub mod verifier;

pub use engine::{GatewaySnapshot, VerificationGateway};
pub use error::GatewayError;
pub use request::{
    digest_proof, ProofDispatch, VerdictDelivery, VerdictRecord, VerdictRelay, VerificationRequest,
};
pub use scoring::{DeviceSignals, FixedScorer, ParticipationHistory, RiskScoreProvider};
pub use verifier::VerifierRegistry;
