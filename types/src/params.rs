//! Protocol parameters — distribution weights and verification thresholds.
//!
//! The four distribution weights must sum to exactly 10000 bps so every
//! settlement conserves value. The defaults keep a 60% participant share
//! and split the rest 2000:1200:800 across direct referrer, indirect
//! referrers, and platform. `validate` rejects any weight table that
//! does not sum to the whole, so a misconfigured node refuses to start
//! instead of silently minting or burning reward units.

use serde::{Deserialize, Serialize};

/// Basis-point denominator: 10000 bps = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// All tunable protocol values, shared by every engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Distribution weights ─────────────────────────────────────────────
    /// Participant share of a gross reward, in basis points.
    pub participant_share_bps: u32,

    /// Direct (tier-1) referrer share, in basis points.
    pub direct_referrer_share_bps: u32,

    /// Combined indirect (tier-2+) referrer share, in basis points.
    /// Split evenly across `indirect_tiers`; the split must be exact.
    pub indirect_referrer_share_bps: u32,

    /// Platform fee, in basis points. Also absorbs shares of absent
    /// referrer tiers and every integer-division rounding remainder, so
    /// the four shares always sum exactly to the gross amount.
    pub platform_fee_bps: u32,

    /// Number of indirect referrer tiers paid out (tiers 2..).
    /// The full referral chain is 1 direct + `indirect_tiers` indirect.
    pub indirect_tiers: u32,

    // ── Verification ─────────────────────────────────────────────────────
    /// Minimum acceptable risk score applied when a task does not set
    /// its own threshold.
    pub default_min_score: u8,
}

impl ProtocolParams {
    /// QUEST defaults — the intended configuration for a live deployment.
    pub fn quest_defaults() -> Self {
        Self {
            participant_share_bps: 6000,       // 60%
            direct_referrer_share_bps: 2000,   // 20%
            indirect_referrer_share_bps: 1200, // 12% combined
            platform_fee_bps: 800,             // 8%
            indirect_tiers: 2,                 // tiers 2 and 3
            default_min_score: 50,
        }
    }

    /// Check the internal consistency of the parameter set.
    ///
    /// The four weights must sum to exactly [`BPS_DENOMINATOR`], the
    /// indirect share must split evenly across the configured tiers, and
    /// the tier count is bounded by the fixed chain depth.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let sum = self.participant_share_bps
            + self.direct_referrer_share_bps
            + self.indirect_referrer_share_bps
            + self.platform_fee_bps;
        if sum != BPS_DENOMINATOR {
            return Err(ParamsError::WeightSum { sum });
        }
        if self.indirect_tiers == 0 || self.indirect_tiers > 3 {
            return Err(ParamsError::TierCount(self.indirect_tiers));
        }
        if self.indirect_referrer_share_bps % self.indirect_tiers != 0 {
            return Err(ParamsError::UnevenIndirectSplit {
                share_bps: self.indirect_referrer_share_bps,
                tiers: self.indirect_tiers,
            });
        }
        if self.default_min_score > 100 {
            return Err(ParamsError::ScoreOutOfRange(self.default_min_score));
        }
        Ok(())
    }

    /// Basis points paid to a single indirect tier.
    pub fn per_indirect_tier_bps(&self) -> u32 {
        self.indirect_referrer_share_bps / self.indirect_tiers
    }
}

/// Default is the QUEST live configuration.
impl Default for ProtocolParams {
    fn default() -> Self {
        Self::quest_defaults()
    }
}

/// Parameter-set consistency violations.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("distribution weights sum to {sum} bps, expected {BPS_DENOMINATOR}")]
    WeightSum { sum: u32 },

    #[error("indirect tier count {0} outside 1..=3")]
    TierCount(u32),

    #[error("indirect share {share_bps} bps does not split evenly across {tiers} tiers")]
    UnevenIndirectSplit { share_bps: u32, tiers: u32 },

    #[error("default minimum risk score {0} exceeds 100")]
    ScoreOutOfRange(u8),
}
