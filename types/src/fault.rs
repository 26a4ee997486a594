//! Cross-component fault classification.
//!
//! Every component error maps into exactly one of these kinds before it
//! crosses a component boundary; the node logs and reacts by kind, never
//! by inspecting another crate's internals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five fault classes a QUEST operation can fail with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// Malformed or out-of-range input. Rejected before any state
    /// mutation; not retryable without correcting the input.
    Validation,
    /// Caller lacks the required capability for the entry point.
    /// Fatal to the call; logged; never silently downgraded.
    Authorization,
    /// The operation conflicts with current state (duplicate completion,
    /// closed window, already-processed request). Retryable only after
    /// the conflicting condition changes.
    StateConflict,
    /// Insufficient resources to complete (pool balance). The obligation
    /// is recorded and retried later; never silently dropped.
    Resource,
    /// A misbehaving external collaborator (malformed or replayed verdict
    /// delivery). Rejected at the boundary.
    External,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FaultKind::Validation => "validation",
            FaultKind::Authorization => "authorization",
            FaultKind::StateConflict => "state-conflict",
            FaultKind::Resource => "resource",
            FaultKind::External => "external",
        };
        write!(f, "{s}")
    }
}
