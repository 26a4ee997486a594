use quest_types::FaultKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("participant {0} already has a frozen referral chain")]
    AlreadyRegistered(String),

    #[error("referral code {0} does not resolve to a known identity")]
    InvalidReferrerCode(String),

    #[error("participant {0} cannot refer themself")]
    SelfReferral(String),

    #[error("code {code} already issued to {existing}, cannot reissue to {candidate}")]
    CodeCollision {
        code: String,
        existing: String,
        candidate: String,
    },

    #[error("no referral record for participant {0}")]
    UnknownParticipant(String),
}

impl ReferralError {
    /// Classify this error into the protocol-wide fault taxonomy.
    pub fn kind(&self) -> FaultKind {
        match self {
            ReferralError::AlreadyRegistered(_) => FaultKind::StateConflict,
            ReferralError::InvalidReferrerCode(_) => FaultKind::Validation,
            ReferralError::SelfReferral(_) => FaultKind::Validation,
            ReferralError::CodeCollision { .. } => FaultKind::StateConflict,
            ReferralError::UnknownParticipant(_) => FaultKind::Validation,
        }
    }
}
