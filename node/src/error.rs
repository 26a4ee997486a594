use quest_types::FaultKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("task registry error: {0}")]
    Task(#[from] quest_registry::TaskError),

    #[error("verification gateway error: {0}")]
    Gateway(#[from] quest_gateway::GatewayError),

    #[error("settlement error: {0}")]
    Settlement(#[from] quest_settlement::SettlementError),

    #[error("referral error: {0}")]
    Referral(#[from] quest_referral::ReferralError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot serialization error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl NodeError {
    /// The fault class of the underlying component error, where one exists.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            NodeError::Task(e) => Some(e.kind()),
            NodeError::Gateway(e) => Some(e.kind()),
            NodeError::Settlement(e) => Some(e.kind()),
            NodeError::Referral(e) => Some(e.kind()),
            NodeError::Config(_) => Some(FaultKind::Validation),
            _ => None,
        }
    }
}
