//! The split computation.
//!
//! Pure arithmetic, no engine state: given a gross amount and which
//! referrer tiers are present, produce the four shares. The platform
//! bucket is the balancing item — it receives its own fee, the shares of
//! absent tiers, and every integer-division remainder, which is what makes
//! `participant + direct + indirect + platform == gross` hold exactly for
//! all inputs.

use quest_types::{ProtocolParams, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

/// The exact share breakdown of one settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub gross: u128,
    pub participant: u128,
    /// Zero when the participant has no (active) direct referrer.
    pub direct: u128,
    /// Per-tier indirect shares, tier 2 first. Zero entries for absent tiers.
    pub indirect: Vec<u128>,
    /// Platform fee plus absent-tier shares plus rounding remainder.
    pub platform: u128,
}

impl Distribution {
    /// Compute the split for `gross`, paying only the tiers marked present.
    ///
    /// `indirect_present` must have exactly `params.indirect_tiers` entries.
    pub fn compute(
        gross: u128,
        direct_present: bool,
        indirect_present: &[bool],
        params: &ProtocolParams,
    ) -> Self {
        debug_assert_eq!(indirect_present.len(), params.indirect_tiers as usize);

        let participant = bps_share(gross, params.participant_share_bps);
        let direct = if direct_present {
            bps_share(gross, params.direct_referrer_share_bps)
        } else {
            0
        };
        let per_tier_bps = params.per_indirect_tier_bps();
        let indirect: Vec<u128> = indirect_present
            .iter()
            .map(|present| {
                if *present {
                    bps_share(gross, per_tier_bps)
                } else {
                    0
                }
            })
            .collect();

        let paid_out = participant + direct + indirect.iter().sum::<u128>();
        let platform = gross - paid_out;

        Self {
            gross,
            participant,
            direct,
            indirect,
            platform,
        }
    }

    /// Combined referrer share (direct + all indirect tiers).
    pub fn referrer_total(&self) -> u128 {
        self.direct + self.indirect.iter().sum::<u128>()
    }

    /// Sum of all four buckets. Always equals `gross`.
    pub fn total(&self) -> u128 {
        self.participant + self.direct + self.indirect.iter().sum::<u128>() + self.platform
    }
}

/// Floor of `gross * bps / 10000`, exact for the full u128 range.
///
/// Decomposes `gross = q * 10000 + r` so neither partial product can
/// overflow: `q * bps` stays below `u128::MAX` and `r * bps` is tiny.
fn bps_share(gross: u128, bps: u32) -> u128 {
    let denom = BPS_DENOMINATOR as u128;
    let bps = bps as u128;
    let q = gross / denom;
    let r = gross % denom;
    q * bps + r * bps / denom
}
