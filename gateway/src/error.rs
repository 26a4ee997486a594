use quest_types::{FaultKind, ProofCategory, RequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no verifier registered for category {0}")]
    NoVerifierForCategory(ProofCategory),

    #[error("no such verification request: {0}")]
    UnknownRequest(RequestId),

    #[error("request {0} has already been processed")]
    AlreadyProcessed(RequestId),

    #[error("risk score {0} outside 0..=100")]
    ScoreOutOfRange(u8),

    #[error("stale nonce from verifier {verifier}: got {got}, last accepted {last}")]
    StaleNonce {
        verifier: String,
        got: u64,
        last: u64,
    },

    #[error("caller {0} lacks the required capability")]
    NotAuthorized(String),
}

impl GatewayError {
    /// Classify this error into the protocol-wide fault taxonomy.
    pub fn kind(&self) -> FaultKind {
        match self {
            GatewayError::NoVerifierForCategory(_) => FaultKind::Validation,
            GatewayError::UnknownRequest(_) => FaultKind::Validation,
            GatewayError::AlreadyProcessed(_) => FaultKind::StateConflict,
            GatewayError::ScoreOutOfRange(_) => FaultKind::External,
            GatewayError::StaleNonce { .. } => FaultKind::External,
            GatewayError::NotAuthorized(_) => FaultKind::Authorization,
        }
    }
}
