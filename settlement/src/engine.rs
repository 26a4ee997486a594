//! The settlement engine — pool custody, transfers, owed obligations.

use std::collections::{HashMap, HashSet};

use crate::audit::{PayoutRole, SettlementRecord, Transfer};
use crate::distribution::Distribution;
use crate::error::SettlementError;
use quest_referral::{EarningRole, ReferralLedger};
use quest_types::{Address, Amount, AssetId, ProtocolParams, TaskId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A settlement that could not execute for lack of pool balance.
///
/// Obligations are never dropped: they queue until the pool is topped up
/// and [`SettlementEngine::retry_owed`] replays them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Obligation {
    pub participant: Address,
    pub gross: Amount,
    pub asset: AssetId,
    pub task_id: TaskId,
    pub recorded_at: Timestamp,
}

/// Executes reward splits against per-asset pool and account balances.
///
/// `distribute` is gated on the Task Registry's identity — the registry is
/// the only component allowed to trigger a payout, and only the
/// administrator may rewire that authority or the asset allow-list.
pub struct SettlementEngine {
    admin: Address,
    registry_authority: Option<Address>,
    platform_account: Address,
    supported_assets: HashSet<AssetId>,
    /// Undisbursed funds per asset, topped up via `deposit`.
    pool: HashMap<AssetId, u128>,
    /// Settled balances per recipient per asset.
    accounts: HashMap<Address, HashMap<AssetId, u128>>,
    owed: Vec<Obligation>,
    /// Audit records pending pickup by the node's audit sink.
    records: Vec<SettlementRecord>,
}

impl SettlementEngine {
    pub fn new(admin: Address, platform_account: Address) -> Self {
        Self {
            admin,
            registry_authority: None,
            platform_account,
            supported_assets: HashSet::new(),
            pool: HashMap::new(),
            accounts: HashMap::new(),
            owed: Vec::new(),
            records: Vec::new(),
        }
    }

    fn require_admin(&self, caller: &Address) -> Result<(), SettlementError> {
        if caller != &self.admin {
            return Err(SettlementError::NotAdmin(caller.to_string()));
        }
        Ok(())
    }

    /// Set the identity allowed to invoke `distribute`.
    pub fn set_registry_authority(
        &mut self,
        caller: &Address,
        registry: Address,
    ) -> Result<(), SettlementError> {
        self.require_admin(caller)?;
        self.registry_authority = Some(registry);
        Ok(())
    }

    /// Add an asset to the allow-list.
    pub fn add_supported_asset(
        &mut self,
        caller: &Address,
        asset: AssetId,
    ) -> Result<(), SettlementError> {
        self.require_admin(caller)?;
        self.supported_assets.insert(asset);
        Ok(())
    }

    /// Remove an asset from the allow-list. Existing balances are kept;
    /// only new deposits and settlements are blocked.
    pub fn remove_supported_asset(
        &mut self,
        caller: &Address,
        asset: &AssetId,
    ) -> Result<(), SettlementError> {
        self.require_admin(caller)?;
        self.supported_assets.remove(asset);
        Ok(())
    }

    pub fn is_asset_supported(&self, asset: &AssetId) -> bool {
        self.supported_assets.contains(asset)
    }

    /// Top up the disbursement pool for an asset.
    pub fn deposit(&mut self, asset: &AssetId, amount: Amount) -> Result<(), SettlementError> {
        if !self.supported_assets.contains(asset) {
            return Err(SettlementError::AssetNotSupported(asset.to_string()));
        }
        let balance = self.pool.entry(asset.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount.raw())
            .ok_or_else(|| SettlementError::BalanceOverflow(asset.to_string()))?;
        Ok(())
    }

    /// Split `gross` for `participant` and execute the transfers.
    ///
    /// Registry-authority-gated. On insufficient pool balance the
    /// obligation is queued as owed and the call fails with
    /// `InsufficientPoolBalance`; nothing else is mutated.
    #[allow(clippy::too_many_arguments)]
    pub fn distribute(
        &mut self,
        caller: &Address,
        participant: &Address,
        gross: Amount,
        asset: &AssetId,
        task_id: TaskId,
        ledger: &mut ReferralLedger,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Result<SettlementRecord, SettlementError> {
        match &self.registry_authority {
            Some(authority) if caller == authority => {}
            _ => return Err(SettlementError::NotAuthorized(caller.to_string())),
        }
        if !self.supported_assets.contains(asset) {
            return Err(SettlementError::AssetNotSupported(asset.to_string()));
        }

        let available = self.pool.get(asset).copied().unwrap_or(0);
        if available < gross.raw() {
            warn!(
                task = %task_id,
                participant = %participant,
                needed = gross.raw(),
                available,
                "settlement deferred: pool balance insufficient"
            );
            self.owed.push(Obligation {
                participant: participant.clone(),
                gross,
                asset: asset.clone(),
                task_id,
                recorded_at: now,
            });
            return Err(SettlementError::InsufficientPoolBalance {
                asset: asset.to_string(),
                needed: gross.raw(),
                available,
            });
        }

        self.settle(participant, gross, asset, task_id, ledger, params, now)
    }

    /// Replay owed obligations that the pool can now cover.
    ///
    /// Obligations whose asset is still unsupported or still unfunded stay
    /// queued. Returns the records of every settlement executed.
    pub fn retry_owed(
        &mut self,
        ledger: &mut ReferralLedger,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Vec<SettlementRecord> {
        let pending = std::mem::take(&mut self.owed);
        let mut settled = Vec::new();
        for obligation in pending {
            let payable = self.supported_assets.contains(&obligation.asset)
                && self.pool.get(&obligation.asset).copied().unwrap_or(0)
                    >= obligation.gross.raw();
            if !payable {
                self.owed.push(obligation);
                continue;
            }
            match self.settle(
                &obligation.participant,
                obligation.gross,
                &obligation.asset,
                obligation.task_id,
                ledger,
                params,
                now,
            ) {
                Ok(record) => settled.push(record),
                Err(err) => {
                    warn!(task = %obligation.task_id, error = %err, "owed retry failed");
                    self.owed.push(obligation);
                }
            }
        }
        settled
    }

    /// Execute a split whose preconditions have already been checked.
    #[allow(clippy::too_many_arguments)]
    fn settle(
        &mut self,
        participant: &Address,
        gross: Amount,
        asset: &AssetId,
        task_id: TaskId,
        ledger: &mut ReferralLedger,
        params: &ProtocolParams,
        now: Timestamp,
    ) -> Result<SettlementRecord, SettlementError> {
        let chain = ledger.payout_chain(participant, params.indirect_tiers as usize);
        let indirect_present: Vec<bool> = chain.indirect.iter().map(Option::is_some).collect();
        let split = Distribution::compute(
            gross.raw(),
            chain.direct.is_some(),
            &indirect_present,
            params,
        );

        let mut transfers = Vec::new();
        transfers.push(Transfer {
            recipient: participant.clone(),
            amount: Amount::new(split.participant),
            role: PayoutRole::Participant,
        });
        if let Some(direct) = &chain.direct {
            transfers.push(Transfer {
                recipient: direct.clone(),
                amount: Amount::new(split.direct),
                role: PayoutRole::DirectReferrer,
            });
        }
        for (i, slot) in chain.indirect.iter().enumerate() {
            if let Some(referrer) = slot {
                transfers.push(Transfer {
                    recipient: referrer.clone(),
                    amount: Amount::new(split.indirect[i]),
                    role: PayoutRole::IndirectReferrer {
                        tier: (i + 2) as u8,
                    },
                });
            }
        }
        transfers.push(Transfer {
            recipient: self.platform_account.clone(),
            amount: Amount::new(split.platform),
            role: PayoutRole::Platform,
        });

        // All transfers are validated; debit the pool and credit accounts
        // as one unit inside the caller's lock scope.
        let pool = self.pool.entry(asset.clone()).or_insert(0);
        *pool -= gross.raw();

        for transfer in &transfers {
            self.credit(&transfer.recipient, asset, transfer.amount)?;
            match transfer.role {
                PayoutRole::DirectReferrer => {
                    ledger.record_earning(&transfer.recipient, transfer.amount, EarningRole::Direct)
                }
                PayoutRole::IndirectReferrer { .. } => ledger.record_earning(
                    &transfer.recipient,
                    transfer.amount,
                    EarningRole::Indirect,
                ),
                _ => {}
            }
        }

        let record = SettlementRecord {
            task_id,
            participant: participant.clone(),
            asset: asset.clone(),
            gross_amount: gross,
            participant_share: Amount::new(split.participant),
            referrer_share: Amount::new(split.referrer_total()),
            platform_share: Amount::new(split.platform),
            timestamp: now,
            transfers,
        };
        debug_assert!(record.is_balanced());

        info!(
            task = %task_id,
            participant = %participant,
            gross = gross.raw(),
            participant_share = split.participant,
            referrer_share = split.referrer_total(),
            platform_share = split.platform,
            "settlement executed"
        );
        self.records.push(record.clone());
        Ok(record)
    }

    fn credit(
        &mut self,
        recipient: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), SettlementError> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self
            .accounts
            .entry(recipient.clone())
            .or_default()
            .entry(asset.clone())
            .or_insert(0);
        *balance = balance
            .checked_add(amount.raw())
            .ok_or_else(|| SettlementError::BalanceOverflow(recipient.to_string()))?;
        Ok(())
    }

    /// Settled balance of an account for an asset.
    pub fn balance_of(&self, identity: &Address, asset: &AssetId) -> u128 {
        self.accounts
            .get(identity)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    /// Undisbursed pool balance for an asset.
    pub fn pool_balance(&self, asset: &AssetId) -> u128 {
        self.pool.get(asset).copied().unwrap_or(0)
    }

    /// Obligations waiting on pool funding.
    pub fn owed(&self) -> &[Obligation] {
        &self.owed
    }

    /// Drain audit records for the node's audit sink.
    pub fn drain_records(&mut self) -> Vec<SettlementRecord> {
        std::mem::take(&mut self.records)
    }

    /// Serialize engine state for persistence.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            admin: self.admin.clone(),
            registry_authority: self.registry_authority.clone(),
            platform_account: self.platform_account.clone(),
            supported_assets: self.supported_assets.clone(),
            pool: self.pool.clone(),
            accounts: self.accounts.clone(),
            owed: self.owed.clone(),
        }
    }

    /// Restore engine state from a persisted snapshot.
    pub fn restore(snapshot: EngineSnapshot) -> Self {
        Self {
            admin: snapshot.admin,
            registry_authority: snapshot.registry_authority,
            platform_account: snapshot.platform_account,
            supported_assets: snapshot.supported_assets,
            pool: snapshot.pool,
            accounts: snapshot.accounts,
            owed: snapshot.owed,
            records: Vec::new(),
        }
    }
}

/// Serializable snapshot of engine state for persistence across restarts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub admin: Address,
    pub registry_authority: Option<Address>,
    pub platform_account: Address,
    pub supported_assets: HashSet<AssetId>,
    pub pool: HashMap<AssetId, u128>,
    pub accounts: HashMap<Address, HashMap<AssetId, u128>>,
    pub owed: Vec<Obligation>,
}
