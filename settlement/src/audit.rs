//! Per-settlement audit records.
//!
//! One record is emitted per settlement, summarizing gross and
//! per-recipient amounts so an external audit store can reconcile payouts
//! without re-deriving the split. The record layout is the externally
//! depended-on contract; the storage medium is not ours.

use quest_types::{Address, Amount, AssetId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// Why a recipient appears in a settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutRole {
    Participant,
    DirectReferrer,
    /// Indirect referrer at the given chain tier (2 or 3).
    IndirectReferrer { tier: u8 },
    Platform,
}

/// A single transfer executed during a settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub recipient: Address,
    pub amount: Amount,
    pub role: PayoutRole,
}

/// The audit summary of one settlement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub task_id: TaskId,
    pub participant: Address,
    pub asset: AssetId,
    pub gross_amount: Amount,
    pub participant_share: Amount,
    /// Direct plus indirect referrer shares combined.
    pub referrer_share: Amount,
    pub platform_share: Amount,
    pub timestamp: Timestamp,
    /// Every transfer executed, in payout order.
    pub transfers: Vec<Transfer>,
}

impl SettlementRecord {
    /// Shares must reassemble the gross amount exactly.
    pub fn is_balanced(&self) -> bool {
        self.participant_share
            .checked_add(self.referrer_share)
            .and_then(|s| s.checked_add(self.platform_share))
            == Some(self.gross_amount)
    }
}
