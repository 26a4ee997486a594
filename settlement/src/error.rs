use quest_types::FaultKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("caller {0} is not the registry authority")]
    NotAuthorized(String),

    #[error("caller {0} is not the administrator")]
    NotAdmin(String),

    #[error("asset {0} is not on the allow-list")]
    AssetNotSupported(String),

    #[error("pool balance for {asset} insufficient: needed {needed}, available {available}")]
    InsufficientPoolBalance {
        asset: String,
        needed: u128,
        available: u128,
    },

    #[error("balance overflow crediting {0}")]
    BalanceOverflow(String),
}

impl SettlementError {
    /// Classify this error into the protocol-wide fault taxonomy.
    pub fn kind(&self) -> FaultKind {
        match self {
            SettlementError::NotAuthorized(_) | SettlementError::NotAdmin(_) => {
                FaultKind::Authorization
            }
            SettlementError::AssetNotSupported(_) => FaultKind::Validation,
            SettlementError::InsufficientPoolBalance { .. } => FaultKind::Resource,
            SettlementError::BalanceOverflow(_) => FaultKind::Resource,
        }
    }
}
