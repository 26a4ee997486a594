//! Node wiring: engines, locks, and the verification/settlement pipeline.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use quest_gateway::{GatewaySnapshot, ProofDispatch, VerdictDelivery, VerificationGateway};
use quest_referral::{LedgerSnapshot, ReferralCode, ReferralLedger};
use quest_registry::{RegistrySnapshot, TaskRegistry, TaskSpec, TaskStatus};
use quest_settlement::{EngineSnapshot, SettlementEngine, SettlementError, SettlementRecord};
use quest_types::{Address, Amount, AssetId, ProofCategory, RequestId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;

/// Transport to one external verifier.
///
/// `deliver` must not block: the call returning says nothing about when —
/// or whether — a verdict will come back. The node tolerates verdicts
/// arriving after arbitrary delay, and tolerates them never arriving (the
/// task simply never settles; there is no timeout-driven unwind).
pub trait VerifierHandle: Send + Sync {
    fn deliver(&self, dispatch: ProofDispatch);
}

/// The outcome of a verdict delivery, seen end to end.
#[derive(Clone, Debug)]
pub enum VerdictOutcome {
    /// Verdict recorded; no settlement was due (failed verification,
    /// score below threshold, or already settled).
    Recorded,
    /// Settlement executed; the audit record is attached.
    Settled(SettlementRecord),
    /// Settlement due but deferred for lack of pool balance; it stays
    /// owed until the pool is topped up and `retry_owed` runs.
    Deferred,
}

/// The QUEST node — holds every engine behind a lock and exposes the
/// protocol's public entry points.
///
/// Lock order is always registry → gateway → settlement → referral; each
/// entry point takes the locks it needs up front and holds them for the
/// whole operation, so every state mutation is an indivisible unit and
/// re-entry through an external call cannot observe partial state.
pub struct Node {
    config: NodeConfig,
    registry: Arc<Mutex<TaskRegistry>>,
    gateway: Arc<Mutex<VerificationGateway>>,
    settlement: Arc<Mutex<SettlementEngine>>,
    referral: Arc<Mutex<ReferralLedger>>,
    verifier_handles: Arc<RwLock<HashMap<Address, Arc<dyn VerifierHandle>>>>,
    metrics: Arc<NodeMetrics>,
    /// Settled audit records awaiting pickup by the external audit store.
    audit: Arc<Mutex<Vec<SettlementRecord>>>,
}

impl Node {
    /// Build a node with fresh engines wired per `config`.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let admin = config.admin_address.clone();
        let mut registry = TaskRegistry::new(admin.clone());
        registry.set_gateway_authority(&admin, config.gateway_address.clone())?;

        let mut gateway = VerificationGateway::new(admin.clone());
        gateway.set_registry_authority(&admin, config.registry_address.clone())?;

        let mut settlement =
            SettlementEngine::new(admin.clone(), config.platform_address.clone());
        settlement.set_registry_authority(&admin, config.registry_address.clone())?;

        info!(admin = %admin, "node initialized");
        Ok(Self {
            config,
            registry: Arc::new(Mutex::new(registry)),
            gateway: Arc::new(Mutex::new(gateway)),
            settlement: Arc::new(Mutex::new(settlement)),
            referral: Arc::new(Mutex::new(ReferralLedger::new())),
            verifier_handles: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(NodeMetrics::new()),
            audit: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Attach the transport for a verifier identity.
    pub async fn attach_verifier(&self, identity: Address, handle: Arc<dyn VerifierHandle>) {
        self.verifier_handles.write().await.insert(identity, handle);
    }

    // ── Participant entry points ────────────────────────────────────────

    /// Record a completion and route its proof to a verifier.
    ///
    /// The whole operation runs under the registry and gateway locks; the
    /// only thing left outside is the fire-and-forget dispatch itself.
    pub async fn submit_completion(
        &self,
        task_id: TaskId,
        participant: &Address,
        proof: Vec<u8>,
    ) -> Result<RequestId, NodeError> {
        let now = Timestamp::now();
        let mut registry = self.registry.lock().await;
        let mut gateway = self.gateway.lock().await;

        // A proof nobody can verify must fail before the completion is
        // recorded, or the participant would burn their one submission.
        let task = registry
            .get_task(task_id)
            .ok_or(quest_registry::TaskError::UnknownTask(task_id))?;
        let category = task.category.proof_category();
        if !gateway.has_verifier_for(category) {
            return Err(quest_gateway::GatewayError::NoVerifierForCategory(category).into());
        }

        let ticket = registry.submit_completion(task_id, participant, proof, now)?;
        let request_id = gateway.submit(
            &self.config.registry_address,
            ticket.task_id,
            &ticket.participant,
            ticket.category,
            ticket.proof,
            now,
        )?;

        self.metrics.completions_submitted.inc();
        self.metrics
            .unprocessed_requests
            .set(gateway.unprocessed_count() as i64);

        let dispatches = gateway.drain_dispatches();
        drop(gateway);
        drop(registry);

        self.dispatch_to_verifiers(dispatches).await;
        Ok(request_id)
    }

    /// Consume a verifier's verdict: gateway intake, registry update, and
    /// (when due) settlement — one indivisible unit under the locks.
    pub async fn deliver_verdict(
        &self,
        caller: &Address,
        delivery: VerdictDelivery,
    ) -> Result<VerdictOutcome, NodeError> {
        let now = Timestamp::now();
        let mut registry = self.registry.lock().await;
        let mut gateway = self.gateway.lock().await;

        let relay = match gateway.deliver_verdict(caller, delivery, now) {
            Ok(relay) => {
                self.metrics.verdicts_accepted.inc();
                relay
            }
            Err(err) => {
                self.metrics.verdicts_rejected.inc();
                warn!(caller = %caller, fault = %err.kind(), error = %err, "verdict rejected");
                return Err(err.into());
            }
        };
        self.metrics
            .unprocessed_requests
            .set(gateway.unprocessed_count() as i64);

        let instruction = registry.on_verdict(
            &self.config.gateway_address,
            relay.task_id,
            &relay.participant,
            relay.verified,
            relay.risk_score,
        )?;
        drop(gateway);
        drop(registry);

        let Some(instruction) = instruction else {
            return Ok(VerdictOutcome::Recorded);
        };

        let mut settlement = self.settlement.lock().await;
        let mut referral = self.referral.lock().await;
        let result = settlement.distribute(
            &self.config.registry_address,
            &instruction.participant,
            instruction.reward,
            &instruction.asset,
            instruction.task_id,
            &mut referral,
            &self.config.params,
            now,
        );
        match result {
            Ok(record) => {
                self.metrics.settlements_executed.inc();
                self.audit.lock().await.extend(settlement.drain_records());
                Ok(VerdictOutcome::Settled(record))
            }
            Err(SettlementError::InsufficientPoolBalance { .. }) => {
                self.metrics.settlements_deferred.inc();
                self.metrics
                    .owed_obligations
                    .set(settlement.owed().len() as i64);
                Ok(VerdictOutcome::Deferred)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Register a participant under a referrer's code.
    pub async fn register_referral(
        &self,
        participant: &Address,
        code: &ReferralCode,
    ) -> Result<(), NodeError> {
        let mut referral = self.referral.lock().await;
        referral.register_referral(participant, code, Timestamp::now())?;
        Ok(())
    }

    /// Issue the canonical referral code for an identity.
    pub async fn issue_referral_code(&self, identity: &Address) -> Result<ReferralCode, NodeError> {
        let mut referral = self.referral.lock().await;
        Ok(referral.issue_code(identity)?)
    }

    // ── Administrative entry points ─────────────────────────────────────

    /// Create a task. Admin-gated by the registry.
    pub async fn create_task(&self, caller: &Address, spec: TaskSpec) -> Result<TaskId, NodeError> {
        let mut registry = self.registry.lock().await;
        let id = registry.create_task(caller, spec, Timestamp::now())?;
        self.metrics
            .active_tasks
            .set(registry.active_task_count() as i64);
        Ok(id)
    }

    /// Transition a task's lifecycle status. Admin-gated by the registry.
    pub async fn set_task_status(
        &self,
        caller: &Address,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), NodeError> {
        let mut registry = self.registry.lock().await;
        registry.set_status(caller, task_id, status)?;
        self.metrics
            .active_tasks
            .set(registry.active_task_count() as i64);
        Ok(())
    }

    /// Allow-list an asset in both the registry and the settlement engine.
    pub async fn add_supported_asset(
        &self,
        caller: &Address,
        asset: AssetId,
    ) -> Result<(), NodeError> {
        let mut registry = self.registry.lock().await;
        let mut settlement = self.settlement.lock().await;
        registry.add_supported_asset(caller, asset.clone())?;
        settlement.add_supported_asset(caller, asset)?;
        Ok(())
    }

    /// Remove an asset from both allow-lists.
    pub async fn remove_supported_asset(
        &self,
        caller: &Address,
        asset: &AssetId,
    ) -> Result<(), NodeError> {
        let mut registry = self.registry.lock().await;
        let mut settlement = self.settlement.lock().await;
        registry.remove_supported_asset(caller, asset)?;
        settlement.remove_supported_asset(caller, asset)?;
        Ok(())
    }

    /// Register a verifier for a proof category. Admin-gated.
    pub async fn register_verifier(
        &self,
        caller: &Address,
        identity: Address,
        category: ProofCategory,
    ) -> Result<(), NodeError> {
        let mut gateway = self.gateway.lock().await;
        gateway.register_verifier(caller, identity, category)?;
        Ok(())
    }

    /// Remove a verifier from every category it serves. Admin-gated.
    pub async fn remove_verifier(
        &self,
        caller: &Address,
        identity: &Address,
    ) -> Result<(), NodeError> {
        let mut gateway = self.gateway.lock().await;
        gateway.remove_verifier(caller, identity)?;
        Ok(())
    }

    /// Top up the settlement pool for an asset.
    pub async fn deposit(&self, asset: &AssetId, amount: Amount) -> Result<(), NodeError> {
        let mut settlement = self.settlement.lock().await;
        settlement.deposit(asset, amount)?;
        Ok(())
    }

    /// Replay owed settlements against the (presumably topped-up) pool.
    pub async fn retry_owed(&self) -> Result<Vec<SettlementRecord>, NodeError> {
        let mut settlement = self.settlement.lock().await;
        let mut referral = self.referral.lock().await;
        let settled = settlement.retry_owed(&mut referral, &self.config.params, Timestamp::now());
        if !settled.is_empty() {
            self.metrics
                .settlements_executed
                .inc_by(settled.len() as u64);
            self.audit.lock().await.extend(settlement.drain_records());
        }
        self.metrics
            .owed_obligations
            .set(settlement.owed().len() as i64);
        Ok(settled)
    }

    // ── Read accessors ──────────────────────────────────────────────────

    /// Settled balance of an account for an asset.
    pub async fn balance_of(&self, identity: &Address, asset: &AssetId) -> u128 {
        self.settlement.lock().await.balance_of(identity, asset)
    }

    /// Undisbursed pool balance for an asset.
    pub async fn pool_balance(&self, asset: &AssetId) -> u128 {
        self.settlement.lock().await.pool_balance(asset)
    }

    /// Drain audit records for the external audit store.
    pub async fn drain_audit_records(&self) -> Vec<SettlementRecord> {
        std::mem::take(&mut *self.audit.lock().await)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Write a snapshot of every engine to the data directory.
    pub async fn save_state(&self) -> Result<PathBuf, NodeError> {
        let registry = self.registry.lock().await;
        let gateway = self.gateway.lock().await;
        let settlement = self.settlement.lock().await;
        let referral = self.referral.lock().await;

        let snapshot = NodeSnapshot {
            registry: registry.snapshot(),
            gateway: gateway.snapshot(),
            settlement: settlement.snapshot(),
            referral: referral.snapshot(),
        };
        let bytes = bincode::serialize(&snapshot)?;

        std::fs::create_dir_all(&self.config.data_dir)?;
        let path = self.config.data_dir.join(STATE_FILE);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), "node state saved");
        Ok(path)
    }

    /// Build a node from a previously saved snapshot, or fresh if the
    /// data directory holds none.
    pub fn load_or_new(config: NodeConfig) -> Result<Self, NodeError> {
        let path = config.data_dir.join(STATE_FILE);
        if !path.exists() {
            return Self::new(config);
        }
        config.validate()?;
        let bytes = std::fs::read(&path)?;
        let snapshot: NodeSnapshot = bincode::deserialize(&bytes)?;
        info!(path = %path.display(), "node state restored");
        Ok(Self {
            config,
            registry: Arc::new(Mutex::new(TaskRegistry::restore(snapshot.registry))),
            gateway: Arc::new(Mutex::new(VerificationGateway::restore(snapshot.gateway))),
            settlement: Arc::new(Mutex::new(SettlementEngine::restore(snapshot.settlement))),
            referral: Arc::new(Mutex::new(ReferralLedger::restore(snapshot.referral))),
            verifier_handles: Arc::new(RwLock::new(HashMap::new())),
            metrics: Arc::new(NodeMetrics::new()),
            audit: Arc::new(Mutex::new(Vec::new())),
        })
    }

    // ── Internals ───────────────────────────────────────────────────────

    async fn dispatch_to_verifiers(&self, dispatches: Vec<ProofDispatch>) {
        let handles = self.verifier_handles.read().await;
        for dispatch in dispatches {
            match handles.get(&dispatch.verifier) {
                Some(handle) => handle.deliver(dispatch),
                None => {
                    // Tolerated: the verdict simply never arrives until a
                    // transport is attached and the proof is re-driven.
                    warn!(verifier = %dispatch.verifier, request = %dispatch.request_id, "no transport attached for verifier");
                }
            }
        }
    }
}

const STATE_FILE: &str = "node_state.bin";

/// On-disk image of every engine, written as one bincode blob.
#[derive(Serialize, Deserialize)]
struct NodeSnapshot {
    registry: RegistrySnapshot,
    gateway: GatewaySnapshot,
    settlement: EngineSnapshot,
    referral: LedgerSnapshot,
}
