//! Verification requests and the payloads that cross the gateway boundary.

use quest_types::{Address, ProofCategory, RequestId, RiskScore, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// A proof awaiting (or holding) a verdict.
///
/// `result` is the defined unset sentinel until the verdict lands — it is
/// written whole, exactly once, together with the `processed` flip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: RequestId,
    pub task_id: TaskId,
    pub participant: Address,
    pub category: ProofCategory,
    pub proof: Vec<u8>,
    pub submitted_at: Timestamp,
    pub processed: bool,
    pub result: Option<VerdictRecord>,
}

/// The recorded outcome of a processed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub verified: bool,
    pub risk_score: RiskScore,
    /// Digest of the proof the verifier actually examined.
    pub proof_digest: String,
    pub delivered_at: Timestamp,
    /// The verifier identity that answered.
    pub verifier: Address,
}

/// Outbound fire-and-forget payload to an external verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDispatch {
    pub request_id: RequestId,
    pub task_id: TaskId,
    pub participant: Address,
    pub category: ProofCategory,
    pub proof: Vec<u8>,
    /// The verifier the dispatch is addressed to.
    pub verifier: Address,
}

/// Inbound verdict payload from an external verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictDelivery {
    pub request_id: RequestId,
    pub verified: bool,
    /// Raw score; range-checked at intake.
    pub risk_score: u8,
    pub proof_digest: String,
    /// Must strictly exceed the verifier's last accepted nonce.
    pub nonce: u64,
}

/// What the gateway forwards to the Task Registry after accepting a verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRelay {
    pub task_id: TaskId,
    pub participant: Address,
    pub verified: bool,
    pub risk_score: RiskScore,
}

/// Canonical Blake2b-256 digest of a proof payload, `b2:`-prefixed hex.
///
/// Verifiers put this in their delivery so auditors can tie a verdict to
/// the exact bytes it examined.
pub fn digest_proof(proof: &[u8]) -> String {
    use blake2::digest::consts::U32;
    use blake2::{Blake2b, Digest};

    let mut hasher = Blake2b::<U32>::new();
    hasher.update(proof);
    format!("b2:{}", hex::encode(hasher.finalize()))
}
