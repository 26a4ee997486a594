//! Per-participant completion records.

use quest_types::{Address, RiskScore, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// One participant's completion of one task.
///
/// Created exactly once per (task, participant), never deleted.
/// `verified` flips false→true at most once; `settled` is the one-shot
/// payout latch and is armed independently of `verified`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    pub task_id: TaskId,
    pub participant: Address,
    pub submitted_at: Timestamp,
    /// Opaque proof payload, forwarded to the verifier untouched.
    pub proof: Vec<u8>,
    pub verified: bool,
    /// Unset until the verdict arrives.
    pub risk_score: Option<RiskScore>,
    /// Whether a settlement has been issued for this completion.
    pub settled: bool,
}

impl Completion {
    pub fn new(task_id: TaskId, participant: Address, proof: Vec<u8>, now: Timestamp) -> Self {
        Self {
            task_id,
            participant,
            submitted_at: now,
            proof,
            verified: false,
            risk_score: None,
            settled: false,
        }
    }
}
