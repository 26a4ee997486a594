//! Task definitions and the lifecycle state machine.

use quest_types::{Address, Amount, AssetId, TaskCategory, TaskId, TaskWindow, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// `Active → {Paused, Completed, Cancelled}`, `Paused → Active`.
/// `Completed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the state machine permits moving to `next`.
    pub fn can_transition(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Active, Paused) | (Active, Completed) | (Active, Cancelled) | (Paused, Active)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// Everything an advertiser supplies to create a task.
///
/// Raw start/end timestamps rather than a [`TaskWindow`]: the registry
/// validates the duration itself so a bad window surfaces as
/// `InvalidParameter` like every other creation fault.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskSpec {
    pub advertiser: Address,
    pub category: TaskCategory,
    pub reward: Amount,
    pub asset: AssetId,
    pub max_participants: u32,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Opaque verification-criteria descriptor, interpreted by verifiers.
    pub criteria: String,
    pub kyc_required: bool,
    /// Minimum acceptable sybil risk score for settlement.
    pub min_score: u8,
}

/// A registered task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub advertiser: Address,
    pub category: TaskCategory,
    pub status: TaskStatus,
    pub reward: Amount,
    pub asset: AssetId,
    pub max_participants: u32,
    pub current_participants: u32,
    pub window: TaskWindow,
    pub criteria: String,
    pub kyc_required: bool,
    pub min_score: u8,
    pub created_at: Timestamp,
}

impl Task {
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_matrix() {
        use TaskStatus::*;
        assert!(Active.can_transition(Paused));
        assert!(Active.can_transition(Completed));
        assert!(Active.can_transition(Cancelled));
        assert!(Paused.can_transition(Active));

        assert!(!Paused.can_transition(Completed));
        assert!(!Paused.can_transition(Cancelled));
        assert!(!Active.can_transition(Active));
        for from in [Completed, Cancelled] {
            for to in [Active, Paused, Completed, Cancelled] {
                assert!(!from.can_transition(to), "{from:?} -> {to:?} must be rejected");
            }
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskStatus::Active.is_terminal());
        assert!(!TaskStatus::Paused.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }
}
