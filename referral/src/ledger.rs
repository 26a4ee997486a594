//! The referral ledger engine.

use std::collections::HashMap;

use crate::code::ReferralCode;
use crate::error::ReferralError;
use quest_types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Maximum referral chain length: 1 direct referrer + 2 upstream tiers.
pub const MAX_CHAIN_LEN: usize = 3;

/// The role a referrer earned a payout in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarningRole {
    /// Tier-1 (direct) referrer of the earning participant.
    Direct,
    /// Tier-2 or tier-3 referrer of the earning participant.
    Indirect,
}

/// Per-participant referral state.
///
/// The chain fields are written exactly once, when `chain_frozen` flips to
/// true during registration. Earnings fields accumulate for the lifetime of
/// the record — a record may be created lazily by a first earning before
/// (or without) the participant ever registering a chain of their own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub participant: Address,
    /// Tier-1 referrer. `None` until registration, and permanently `None`
    /// for participants who never register with a code.
    pub direct_referrer: Option<Address>,
    /// Tiers 2 and 3, nearest first. At most `MAX_CHAIN_LEN - 1` entries.
    pub upstream: Vec<Address>,
    /// Whether the chain fields have been frozen by registration.
    pub chain_frozen: bool,
    /// Whether this identity currently participates in payouts.
    pub active: bool,
    pub registered_at: Option<Timestamp>,
    /// Lifetime earnings across both roles.
    pub total_earned: Amount,
    /// Earnings received as a tier-1 referrer.
    pub earned_as_direct: Amount,
    /// Earnings received as a tier-2/3 referrer.
    pub earned_as_indirect: Amount,
}

impl ReferralRecord {
    fn bare(participant: Address) -> Self {
        Self {
            participant,
            direct_referrer: None,
            upstream: Vec::new(),
            chain_frozen: false,
            active: true,
            registered_at: None,
            total_earned: Amount::ZERO,
            earned_as_direct: Amount::ZERO,
            earned_as_indirect: Amount::ZERO,
        }
    }
}

/// The referrer slots a settlement pays into, tier positions preserved.
///
/// An inactive or absent referrer leaves its slot `None` — slots are never
/// promoted, so a missing tier-2 does not turn tier-3 into tier-2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutChain {
    pub direct: Option<Address>,
    /// One slot per configured indirect tier (tier 2 first).
    pub indirect: Vec<Option<Address>>,
}

/// The referral ledger — code issuance, chain registration, earnings.
pub struct ReferralLedger {
    records: HashMap<Address, ReferralRecord>,
    codes: HashMap<ReferralCode, Address>,
}

impl ReferralLedger {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            codes: HashMap::new(),
        }
    }

    /// Issue (or re-derive) the canonical referral code for an identity.
    ///
    /// Idempotent for the same identity. A derived code that is already
    /// mapped to a different identity is rejected rather than remapped.
    pub fn issue_code(&mut self, identity: &Address) -> Result<ReferralCode, ReferralError> {
        let code = ReferralCode::derive(identity);
        match self.codes.get(&code) {
            Some(existing) if existing != identity => Err(ReferralError::CodeCollision {
                code: code.to_string(),
                existing: existing.to_string(),
                candidate: identity.to_string(),
            }),
            Some(_) => Ok(code),
            None => {
                debug!(identity = %identity, code = %code, "referral code issued");
                self.codes.insert(code.clone(), identity.clone());
                Ok(code)
            }
        }
    }

    /// Resolve a code to the identity it was issued to.
    pub fn resolve_code(&self, code: &ReferralCode) -> Option<&Address> {
        self.codes.get(code)
    }

    /// Register a participant under a referrer's code, freezing the chain.
    ///
    /// Walks the resolved referrer's own frozen chain up to two further
    /// hops (tier-2 = the referrer's direct referrer, tier-3 = the
    /// referrer's tier-2), stopping early if the chain is shorter or if a
    /// hop would place the participant upstream of themself.
    pub fn register_referral(
        &mut self,
        participant: &Address,
        code: &ReferralCode,
        now: Timestamp,
    ) -> Result<&ReferralRecord, ReferralError> {
        if self
            .records
            .get(participant)
            .is_some_and(|r| r.chain_frozen)
        {
            return Err(ReferralError::AlreadyRegistered(participant.to_string()));
        }

        let referrer = self
            .codes
            .get(code)
            .cloned()
            .ok_or_else(|| ReferralError::InvalidReferrerCode(code.to_string()))?;

        if &referrer == participant {
            return Err(ReferralError::SelfReferral(participant.to_string()));
        }

        let mut upstream = Vec::new();
        if let Some(referrer_record) = self.records.get(&referrer) {
            let hops = referrer_record
                .direct_referrer
                .iter()
                .chain(referrer_record.upstream.iter())
                .take(MAX_CHAIN_LEN - 1);
            for hop in hops {
                if hop == participant {
                    break;
                }
                upstream.push(hop.clone());
            }
        }

        let record = self
            .records
            .entry(participant.clone())
            .or_insert_with(|| ReferralRecord::bare(participant.clone()));
        record.direct_referrer = Some(referrer.clone());
        record.upstream = upstream;
        record.chain_frozen = true;
        record.registered_at = Some(now);

        info!(
            participant = %participant,
            referrer = %referrer,
            chain_len = 1 + record.upstream.len(),
            "referral chain frozen"
        );
        Ok(&self.records[participant])
    }

    /// The payout slots for a participant's settlement, `indirect_tiers`
    /// indirect slots deep. Inactive referrers leave their slot empty.
    pub fn payout_chain(&self, participant: &Address, indirect_tiers: usize) -> PayoutChain {
        let record = self.records.get(participant);
        let direct = record
            .and_then(|r| r.direct_referrer.clone())
            .filter(|addr| self.is_active(addr));
        let mut indirect = vec![None; indirect_tiers];
        if let Some(r) = record {
            for (slot, addr) in indirect.iter_mut().zip(r.upstream.iter()) {
                if self.is_active(addr) {
                    *slot = Some(addr.clone());
                }
            }
        }
        PayoutChain { direct, indirect }
    }

    /// Whether an identity participates in payouts. Identities without a
    /// record have never been deactivated and count as active.
    pub fn is_active(&self, identity: &Address) -> bool {
        self.records.get(identity).map_or(true, |r| r.active)
    }

    /// Toggle payout participation for an identity.
    pub fn set_active(&mut self, identity: &Address, active: bool) {
        let record = self
            .records
            .entry(identity.clone())
            .or_insert_with(|| ReferralRecord::bare(identity.clone()));
        record.active = active;
    }

    /// Credit a referral earning to an identity, creating a bare record on
    /// first earning.
    pub fn record_earning(&mut self, identity: &Address, amount: Amount, role: EarningRole) {
        let record = self
            .records
            .entry(identity.clone())
            .or_insert_with(|| ReferralRecord::bare(identity.clone()));
        record.total_earned = record.total_earned + amount;
        match role {
            EarningRole::Direct => record.earned_as_direct = record.earned_as_direct + amount,
            EarningRole::Indirect => record.earned_as_indirect = record.earned_as_indirect + amount,
        }
    }

    /// Get the referral record for a participant.
    pub fn get_record(&self, participant: &Address) -> Option<&ReferralRecord> {
        self.records.get(participant)
    }

    /// Number of participants with a frozen chain.
    pub fn registered_count(&self) -> usize {
        self.records.values().filter(|r| r.chain_frozen).count()
    }

    /// Serialize ledger state for persistence.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            records: self.records.clone(),
            codes: self.codes.clone(),
        }
    }

    /// Restore ledger state from a persisted snapshot.
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        Self {
            records: snapshot.records,
            codes: snapshot.codes,
        }
    }
}

impl Default for ReferralLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of the ledger for persistence across restarts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub records: HashMap<Address, ReferralRecord>,
    pub codes: HashMap<ReferralCode, Address>,
}
