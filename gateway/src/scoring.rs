//! The risk-score provider boundary.
//!
//! Sybil scoring is owned by an external collaborator: a pure function of
//! request metadata, consulted by verifiers before they answer. Only the
//! contract lives here — the heuristics behind it (fingerprint checks,
//! automation detection) can be replaced wholesale without touching the
//! protocol core.

use quest_types::{Address, RiskScore, Timestamp};
use serde::{Deserialize, Serialize};

/// Device/request metadata observed when the proof was submitted.
///
/// Opaque key-value pairs by design: the scorer decides what matters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceSignals {
    pub signals: Vec<(String, String)>,
}

/// What the platform has seen of this identity before.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParticipationHistory {
    pub completions: u32,
    pub first_seen: Option<Timestamp>,
}

/// A pure scoring function: metadata in, 0–100 confidence out.
pub trait RiskScoreProvider: Send + Sync {
    fn score(
        &self,
        signals: &DeviceSignals,
        identity: &Address,
        history: &ParticipationHistory,
    ) -> RiskScore;
}

/// Deterministic stub scorer returning a fixed value. Test double for the
/// external heuristic service.
pub struct FixedScorer(pub RiskScore);

impl RiskScoreProvider for FixedScorer {
    fn score(
        &self,
        _signals: &DeviceSignals,
        _identity: &Address,
        _history: &ParticipationHistory,
    ) -> RiskScore {
        self.0
    }
}
