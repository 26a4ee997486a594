//! The verification gateway engine.

use std::collections::HashMap;

use crate::error::GatewayError;
use crate::request::{
    ProofDispatch, VerdictDelivery, VerdictRecord, VerdictRelay, VerificationRequest,
};
use crate::verifier::VerifierRegistry;
use quest_types::{Address, ProofCategory, RequestId, RiskScore, TaskId, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Brokers proofs out to verifiers and verdicts back to the registry.
pub struct VerificationGateway {
    admin: Address,
    /// The only identity allowed to submit verification requests.
    registry_authority: Option<Address>,
    verifiers: VerifierRegistry,
    requests: HashMap<RequestId, VerificationRequest>,
    next_request_id: u64,
    /// Outbound dispatches awaiting async delivery by the node.
    pending_dispatches: Vec<ProofDispatch>,
}

impl VerificationGateway {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            registry_authority: None,
            verifiers: VerifierRegistry::new(),
            requests: HashMap::new(),
            next_request_id: 1,
            pending_dispatches: Vec::new(),
        }
    }

    fn require_admin(&self, caller: &Address) -> Result<(), GatewayError> {
        if caller != &self.admin {
            return Err(GatewayError::NotAuthorized(caller.to_string()));
        }
        Ok(())
    }

    /// Set the identity allowed to invoke `submit`.
    pub fn set_registry_authority(
        &mut self,
        caller: &Address,
        registry: Address,
    ) -> Result<(), GatewayError> {
        self.require_admin(caller)?;
        self.registry_authority = Some(registry);
        Ok(())
    }

    /// Register (or rotate in) a verifier for a proof category.
    pub fn register_verifier(
        &mut self,
        caller: &Address,
        identity: Address,
        category: ProofCategory,
    ) -> Result<(), GatewayError> {
        self.require_admin(caller)?;
        info!(verifier = %identity, category = %category, "verifier registered");
        self.verifiers.register(identity, category);
        Ok(())
    }

    /// Remove a verifier from every category it serves.
    pub fn remove_verifier(
        &mut self,
        caller: &Address,
        identity: &Address,
    ) -> Result<(), GatewayError> {
        self.require_admin(caller)?;
        info!(verifier = %identity, "verifier removed");
        self.verifiers.remove(identity);
        Ok(())
    }

    /// Accept a proof for verification and queue its dispatch.
    ///
    /// The dispatch is fire-and-forget: queuing (and even delivering) it
    /// says nothing about when — or whether — a verdict will arrive.
    pub fn submit(
        &mut self,
        caller: &Address,
        task_id: TaskId,
        participant: &Address,
        category: ProofCategory,
        proof: Vec<u8>,
        now: Timestamp,
    ) -> Result<RequestId, GatewayError> {
        match &self.registry_authority {
            Some(authority) if caller == authority => {}
            _ => return Err(GatewayError::NotAuthorized(caller.to_string())),
        }

        let verifier = self
            .verifiers
            .verifier_for(category)
            .cloned()
            .ok_or(GatewayError::NoVerifierForCategory(category))?;

        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;

        self.requests.insert(
            id,
            VerificationRequest {
                id,
                task_id,
                participant: participant.clone(),
                category,
                proof: proof.clone(),
                submitted_at: now,
                processed: false,
                result: None,
            },
        );
        self.pending_dispatches.push(ProofDispatch {
            request_id: id,
            task_id,
            participant: participant.clone(),
            category,
            proof,
            verifier: verifier.clone(),
        });

        debug!(request = %id, task = %task_id, verifier = %verifier, "verification request queued");
        Ok(id)
    }

    /// Take in a verifier's verdict and produce the relay for the registry.
    ///
    /// Every check runs before any state is touched: caller authorization
    /// against the live capability table, request existence, the
    /// processed-exactly-once rule (duplicate delivery is a hard reject,
    /// unlike the registry's tolerant intake — replay is detected here),
    /// score range, and the strictly-advancing nonce.
    pub fn deliver_verdict(
        &mut self,
        caller: &Address,
        delivery: VerdictDelivery,
        now: Timestamp,
    ) -> Result<VerdictRelay, GatewayError> {
        let request = self
            .requests
            .get(&delivery.request_id)
            .ok_or(GatewayError::UnknownRequest(delivery.request_id))?;

        if !self.verifiers.is_registered_for(caller, request.category) {
            warn!(
                request = %delivery.request_id,
                caller = %caller,
                category = %request.category,
                "verdict from unauthorized identity rejected"
            );
            return Err(GatewayError::NotAuthorized(caller.to_string()));
        }
        if request.processed {
            warn!(request = %delivery.request_id, caller = %caller, "duplicate verdict delivery rejected");
            return Err(GatewayError::AlreadyProcessed(delivery.request_id));
        }
        let risk_score = RiskScore::new(delivery.risk_score)
            .ok_or(GatewayError::ScoreOutOfRange(delivery.risk_score))?;
        self.verifiers.check_and_advance_nonce(caller, delivery.nonce)?;

        let request = self
            .requests
            .get_mut(&delivery.request_id)
            .expect("request presence checked above");
        request.processed = true;
        request.result = Some(VerdictRecord {
            verified: delivery.verified,
            risk_score,
            proof_digest: delivery.proof_digest,
            delivered_at: now,
            verifier: caller.clone(),
        });

        info!(
            request = %delivery.request_id,
            task = %request.task_id,
            verified = delivery.verified,
            score = %risk_score,
            "verdict accepted"
        );
        Ok(VerdictRelay {
            task_id: request.task_id,
            participant: request.participant.clone(),
            verified: delivery.verified,
            risk_score,
        })
    }

    /// Drain outbound dispatches for async delivery.
    pub fn drain_dispatches(&mut self) -> Vec<ProofDispatch> {
        std::mem::take(&mut self.pending_dispatches)
    }

    /// Whether a verifier is currently registered for a category.
    pub fn has_verifier_for(&self, category: ProofCategory) -> bool {
        self.verifiers.verifier_for(category).is_some()
    }

    pub fn get_request(&self, id: RequestId) -> Option<&VerificationRequest> {
        self.requests.get(&id)
    }

    /// Number of requests still awaiting a verdict.
    pub fn unprocessed_count(&self) -> usize {
        self.requests.values().filter(|r| !r.processed).count()
    }

    /// Serialize gateway state for persistence.
    pub fn snapshot(&self) -> GatewaySnapshot {
        GatewaySnapshot {
            admin: self.admin.clone(),
            registry_authority: self.registry_authority.clone(),
            verifiers: self.verifiers.clone(),
            requests: self.requests.clone(),
            next_request_id: self.next_request_id,
        }
    }

    /// Restore gateway state from a persisted snapshot. Pending dispatches
    /// are not persisted — undelivered proofs are re-driven externally.
    pub fn restore(snapshot: GatewaySnapshot) -> Self {
        Self {
            admin: snapshot.admin,
            registry_authority: snapshot.registry_authority,
            verifiers: snapshot.verifiers,
            requests: snapshot.requests,
            next_request_id: snapshot.next_request_id,
            pending_dispatches: Vec::new(),
        }
    }
}

/// Serializable snapshot of gateway state for persistence across restarts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub admin: Address,
    pub registry_authority: Option<Address>,
    pub verifiers: VerifierRegistry,
    pub requests: HashMap<RequestId, VerificationRequest>,
    pub next_request_id: u64,
}
