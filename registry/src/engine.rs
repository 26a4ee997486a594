//! The task registry engine.

use std::collections::{HashMap, HashSet};

use crate::completion::Completion;
use crate::error::TaskError;
use crate::task::{Task, TaskSpec, TaskStatus};
use quest_types::{
    Address, Amount, AssetId, ProofCategory, RiskScore, TaskId, TaskWindow, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What the node forwards to the Verification Gateway after a completion
/// is recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationTicket {
    pub task_id: TaskId,
    pub participant: Address,
    pub category: ProofCategory,
    pub proof: Vec<u8>,
}

/// What the node forwards to the Settlement Engine after a passing verdict.
///
/// Issued at most once per (task, participant) — guarded by the completion's
/// settlement latch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInstruction {
    pub task_id: TaskId,
    pub participant: Address,
    pub reward: Amount,
    pub asset: AssetId,
}

/// Owns tasks and completions; issues verification tickets and settlement
/// instructions.
pub struct TaskRegistry {
    admin: Address,
    /// The only identity whose verdicts are accepted by `on_verdict`.
    gateway_authority: Option<Address>,
    supported_assets: HashSet<AssetId>,
    tasks: HashMap<TaskId, Task>,
    completions: HashMap<(TaskId, Address), Completion>,
    next_task_id: u64,
}

impl TaskRegistry {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            gateway_authority: None,
            supported_assets: HashSet::new(),
            tasks: HashMap::new(),
            completions: HashMap::new(),
            next_task_id: 1,
        }
    }

    fn require_admin(&self, caller: &Address) -> Result<(), TaskError> {
        if caller != &self.admin {
            return Err(TaskError::NotAuthorized(caller.to_string()));
        }
        Ok(())
    }

    /// Set the identity whose verdicts `on_verdict` accepts.
    pub fn set_gateway_authority(
        &mut self,
        caller: &Address,
        gateway: Address,
    ) -> Result<(), TaskError> {
        self.require_admin(caller)?;
        self.gateway_authority = Some(gateway);
        Ok(())
    }

    /// Add a reward asset to the allow-list.
    pub fn add_supported_asset(
        &mut self,
        caller: &Address,
        asset: AssetId,
    ) -> Result<(), TaskError> {
        self.require_admin(caller)?;
        self.supported_assets.insert(asset);
        Ok(())
    }

    /// Remove a reward asset from the allow-list. Existing tasks keep
    /// their asset; only new task creation is blocked.
    pub fn remove_supported_asset(
        &mut self,
        caller: &Address,
        asset: &AssetId,
    ) -> Result<(), TaskError> {
        self.require_admin(caller)?;
        self.supported_assets.remove(asset);
        Ok(())
    }

    /// Register a new task. Admin-gated; every parameter fault is rejected
    /// before any state is touched.
    pub fn create_task(
        &mut self,
        caller: &Address,
        spec: TaskSpec,
        now: Timestamp,
    ) -> Result<TaskId, TaskError> {
        self.require_admin(caller)?;

        if spec.reward.is_zero() {
            return Err(TaskError::InvalidParameter("reward must be non-zero".into()));
        }
        if !self.supported_assets.contains(&spec.asset) {
            return Err(TaskError::InvalidParameter(format!(
                "asset {} is not on the allow-list",
                spec.asset
            )));
        }
        if spec.max_participants == 0 {
            return Err(TaskError::InvalidParameter(
                "participant cap must be non-zero".into(),
            ));
        }
        let window = TaskWindow::new(spec.start, spec.end).ok_or_else(|| {
            TaskError::InvalidParameter("task duration must be positive".into())
        })?;
        if spec.min_score > 100 {
            return Err(TaskError::InvalidParameter(format!(
                "minimum risk score {} exceeds 100",
                spec.min_score
            )));
        }

        let id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;

        let task = Task {
            id,
            advertiser: spec.advertiser,
            category: spec.category,
            status: TaskStatus::Active,
            reward: spec.reward,
            asset: spec.asset,
            max_participants: spec.max_participants,
            current_participants: 0,
            window,
            criteria: spec.criteria,
            kyc_required: spec.kyc_required,
            min_score: spec.min_score,
            created_at: now,
        };
        info!(
            task = %id,
            category = %task.category,
            reward = task.reward.raw(),
            cap = task.max_participants,
            "task created"
        );
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Transition a task's lifecycle status. Admin-gated; terminal states
    /// accept no further transitions.
    pub fn set_status(
        &mut self,
        caller: &Address,
        task_id: TaskId,
        next: TaskStatus,
    ) -> Result<(), TaskError> {
        self.require_admin(caller)?;
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?;
        if !task.status.can_transition(next) {
            return Err(TaskError::InvalidTransition {
                from: format!("{:?}", task.status),
                to: format!("{next:?}"),
            });
        }
        info!(task = %task_id, from = ?task.status, to = ?next, "task status changed");
        task.status = next;
        Ok(())
    }

    /// Record a participant's completion and issue a verification ticket.
    ///
    /// One completion per (task, participant), ever — the record is never
    /// deleted, so a duplicate submission fails regardless of verdict state.
    pub fn submit_completion(
        &mut self,
        task_id: TaskId,
        participant: &Address,
        proof: Vec<u8>,
        now: Timestamp,
    ) -> Result<VerificationTicket, TaskError> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?;

        if task.status != TaskStatus::Active {
            return Err(TaskError::TaskNotActive {
                task: task_id,
                status: format!("{:?}", task.status),
            });
        }
        if !task.window.contains(now) {
            return Err(TaskError::TaskWindowClosed {
                task: task_id,
                now: now.as_secs(),
            });
        }
        // Duplicate before cap: a participant already enrolled on a full
        // task must hear "duplicate", not "full".
        let key = (task_id, participant.clone());
        if self.completions.contains_key(&key) {
            return Err(TaskError::DuplicateCompletion {
                task: task_id,
                participant: participant.to_string(),
            });
        }
        if task.is_full() {
            return Err(TaskError::TaskFull {
                task: task_id,
                cap: task.max_participants,
            });
        }

        task.current_participants += 1;
        let category = task.category.proof_category();
        self.completions.insert(
            key,
            Completion::new(task_id, participant.clone(), proof.clone(), now),
        );

        debug!(task = %task_id, participant = %participant, "completion recorded, verification pending");
        Ok(VerificationTicket {
            task_id,
            participant: participant.clone(),
            category,
            proof,
        })
    }

    /// Consume a verdict relayed by the Verification Gateway.
    ///
    /// Tolerant of at-least-once delivery: a verdict for an already-verified
    /// pair is a no-op, not an error. Returns a settlement instruction
    /// exactly once per (task, participant) — the latch arms on issue and
    /// never resets, independent of the verified flag's own idempotence.
    pub fn on_verdict(
        &mut self,
        caller: &Address,
        task_id: TaskId,
        participant: &Address,
        verified: bool,
        risk_score: RiskScore,
    ) -> Result<Option<SettlementInstruction>, TaskError> {
        match &self.gateway_authority {
            Some(authority) if caller == authority => {}
            _ => return Err(TaskError::NotAuthorized(caller.to_string())),
        }

        let task = self
            .tasks
            .get(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?;
        let completion = self
            .completions
            .get_mut(&(task_id, participant.clone()))
            .ok_or_else(|| TaskError::UnknownCompletion {
                task: task_id,
                participant: participant.to_string(),
            })?;

        if completion.verified {
            debug!(task = %task_id, participant = %participant, "duplicate verdict ignored");
            return Ok(None);
        }

        completion.risk_score = Some(risk_score);
        if !verified {
            info!(task = %task_id, participant = %participant, score = %risk_score, "completion rejected by verifier");
            return Ok(None);
        }
        completion.verified = true;

        if risk_score.value() < task.min_score {
            info!(
                task = %task_id,
                participant = %participant,
                score = %risk_score,
                min = task.min_score,
                "completion verified but below risk threshold, no settlement"
            );
            return Ok(None);
        }
        if completion.settled {
            return Ok(None);
        }
        completion.settled = true;

        info!(task = %task_id, participant = %participant, score = %risk_score, "completion verified, settlement issued");
        Ok(Some(SettlementInstruction {
            task_id,
            participant: participant.clone(),
            reward: task.reward,
            asset: task.asset.clone(),
        }))
    }

    pub fn get_task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn get_completion(&self, task_id: TaskId, participant: &Address) -> Option<&Completion> {
        self.completions.get(&(task_id, participant.clone()))
    }

    pub fn is_asset_supported(&self, asset: &AssetId) -> bool {
        self.supported_assets.contains(asset)
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of tasks currently accepting completions.
    pub fn active_task_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Active)
            .count()
    }

    /// Serialize registry state for persistence.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            admin: self.admin.clone(),
            gateway_authority: self.gateway_authority.clone(),
            supported_assets: self.supported_assets.clone(),
            tasks: self.tasks.clone(),
            completions: self.completions.clone(),
            next_task_id: self.next_task_id,
        }
    }

    /// Restore registry state from a persisted snapshot.
    pub fn restore(snapshot: RegistrySnapshot) -> Self {
        Self {
            admin: snapshot.admin,
            gateway_authority: snapshot.gateway_authority,
            supported_assets: snapshot.supported_assets,
            tasks: snapshot.tasks,
            completions: snapshot.completions,
            next_task_id: snapshot.next_task_id,
        }
    }
}

/// Serializable snapshot of registry state for persistence across restarts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub admin: Address,
    pub gateway_authority: Option<Address>,
    pub supported_assets: HashSet<AssetId>,
    pub tasks: HashMap<TaskId, Task>,
    pub completions: HashMap<(TaskId, Address), Completion>,
    pub next_task_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_types::TaskCategory;

    fn addr(s: &str) -> Address {
        Address::new(format!("qst_{s}"))
    }

    fn spec() -> TaskSpec {
        TaskSpec {
            advertiser: addr("advertiser"),
            category: TaskCategory::Social,
            reward: Amount::new(100),
            asset: AssetId::from("USDQ"),
            max_participants: 3,
            start: Timestamp::new(1000),
            end: Timestamp::new(2000),
            criteria: "retweet the launch post".into(),
            kyc_required: false,
            min_score: 50,
        }
    }

    fn setup() -> (TaskRegistry, Address, Address) {
        let admin = addr("admin");
        let gateway = addr("gateway");
        let mut registry = TaskRegistry::new(admin.clone());
        registry
            .add_supported_asset(&admin, AssetId::from("USDQ"))
            .unwrap();
        registry
            .set_gateway_authority(&admin, gateway.clone())
            .unwrap();
        (registry, admin, gateway)
    }

    fn in_window() -> Timestamp {
        Timestamp::new(1500)
    }

    fn score(v: u8) -> RiskScore {
        RiskScore::new(v).unwrap()
    }

    #[test]
    fn create_task_starts_active_and_empty() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        let task = registry.get_task(id).unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.current_participants, 0);
    }

    #[test]
    fn create_task_ids_are_monotonic() {
        let (mut registry, admin, _) = setup();
        let a = registry.create_task(&admin, spec(), in_window()).unwrap();
        let b = registry.create_task(&admin, spec(), in_window()).unwrap();
        assert!(b.value() > a.value());
    }

    #[test]
    fn create_task_validations() {
        let (mut registry, admin, _) = setup();

        let mut s = spec();
        s.reward = Amount::ZERO;
        assert!(matches!(
            registry.create_task(&admin, s, in_window()),
            Err(TaskError::InvalidParameter(_))
        ));

        let mut s = spec();
        s.asset = AssetId::from("SHADY");
        assert!(matches!(
            registry.create_task(&admin, s, in_window()),
            Err(TaskError::InvalidParameter(_))
        ));

        let mut s = spec();
        s.max_participants = 0;
        assert!(matches!(
            registry.create_task(&admin, s, in_window()),
            Err(TaskError::InvalidParameter(_))
        ));

        let mut s = spec();
        s.end = s.start;
        assert!(matches!(
            registry.create_task(&admin, s, in_window()),
            Err(TaskError::InvalidParameter(_))
        ));

        let mut s = spec();
        s.min_score = 101;
        assert!(matches!(
            registry.create_task(&admin, s, in_window()),
            Err(TaskError::InvalidParameter(_))
        ));

        assert_eq!(registry.task_count(), 0, "no partial task creation");
    }

    #[test]
    fn create_task_requires_admin() {
        let (mut registry, _, _) = setup();
        assert!(matches!(
            registry.create_task(&addr("mallory"), spec(), in_window()),
            Err(TaskError::NotAuthorized(_))
        ));
    }

    #[test]
    fn submit_returns_ticket_with_derived_category() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();

        let ticket = registry
            .submit_completion(id, &addr("alice"), b"proof".to_vec(), in_window())
            .unwrap();
        assert_eq!(ticket.task_id, id);
        assert_eq!(ticket.category, ProofCategory::SocialPost);
        assert_eq!(ticket.proof, b"proof".to_vec());

        let task = registry.get_task(id).unwrap();
        assert_eq!(task.current_participants, 1);
        let completion = registry.get_completion(id, &addr("alice")).unwrap();
        assert!(!completion.verified);
        assert!(completion.risk_score.is_none());
    }

    #[test]
    fn cap_admits_exactly_max_participants() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();

        for i in 0..3 {
            registry
                .submit_completion(id, &addr(&format!("p{i}")), vec![], in_window())
                .unwrap();
        }
        let result = registry.submit_completion(id, &addr("p3"), vec![], in_window());
        assert!(matches!(result, Err(TaskError::TaskFull { cap: 3, .. })));
    }

    #[test]
    fn duplicate_completion_rejected_regardless_of_verdict_state() {
        let (mut registry, admin, gateway) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        let alice = addr("alice");

        registry
            .submit_completion(id, &alice, vec![], in_window())
            .unwrap();
        assert!(matches!(
            registry.submit_completion(id, &alice, vec![], in_window()),
            Err(TaskError::DuplicateCompletion { .. })
        ));

        // Still duplicate after the verdict lands.
        registry
            .on_verdict(&gateway, id, &alice, true, score(80))
            .unwrap();
        assert!(matches!(
            registry.submit_completion(id, &alice, vec![], in_window()),
            Err(TaskError::DuplicateCompletion { .. })
        ));
    }

    #[test]
    fn submission_outside_window_rejected() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();

        for now in [Timestamp::new(999), Timestamp::new(2001)] {
            let result = registry.submit_completion(id, &addr("alice"), vec![], now);
            assert!(matches!(result, Err(TaskError::TaskWindowClosed { .. })));
        }
    }

    #[test]
    fn submission_to_paused_task_rejected() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        registry.set_status(&admin, id, TaskStatus::Paused).unwrap();

        let result = registry.submit_completion(id, &addr("alice"), vec![], in_window());
        assert!(matches!(result, Err(TaskError::TaskNotActive { .. })));

        // Reopening lets submissions through again.
        registry.set_status(&admin, id, TaskStatus::Active).unwrap();
        registry
            .submit_completion(id, &addr("alice"), vec![], in_window())
            .unwrap();
    }

    #[test]
    fn terminal_status_accepts_no_transitions() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        registry
            .set_status(&admin, id, TaskStatus::Cancelled)
            .unwrap();

        let result = registry.set_status(&admin, id, TaskStatus::Active);
        assert!(matches!(result, Err(TaskError::InvalidTransition { .. })));
    }

    #[test]
    fn verdict_from_non_gateway_rejected() {
        let (mut registry, admin, _) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        registry
            .submit_completion(id, &addr("alice"), vec![], in_window())
            .unwrap();

        let result = registry.on_verdict(&addr("mallory"), id, &addr("alice"), true, score(80));
        assert!(matches!(result, Err(TaskError::NotAuthorized(_))));
    }

    #[test]
    fn verdict_without_completion_rejected() {
        let (mut registry, admin, gateway) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();

        let result = registry.on_verdict(&gateway, id, &addr("ghost"), true, score(80));
        assert!(matches!(result, Err(TaskError::UnknownCompletion { .. })));
    }

    #[test]
    fn passing_verdict_issues_settlement_exactly_once() {
        let (mut registry, admin, gateway) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        let alice = addr("alice");
        registry
            .submit_completion(id, &alice, vec![], in_window())
            .unwrap();

        let instruction = registry
            .on_verdict(&gateway, id, &alice, true, score(80))
            .unwrap()
            .expect("passing verdict settles");
        assert_eq!(instruction.reward, Amount::new(100));
        assert_eq!(instruction.asset, AssetId::from("USDQ"));

        // At-least-once delivery: second verdict is a tolerated no-op
        // and must never produce a second instruction.
        let second = registry
            .on_verdict(&gateway, id, &alice, true, score(80))
            .unwrap();
        assert!(second.is_none());

        let completion = registry.get_completion(id, &alice).unwrap();
        assert!(completion.verified);
        assert!(completion.settled);
        assert_eq!(completion.risk_score, Some(score(80)));
    }

    #[test]
    fn verdict_below_min_score_verifies_without_settling() {
        let (mut registry, admin, gateway) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        let alice = addr("alice");
        registry
            .submit_completion(id, &alice, vec![], in_window())
            .unwrap();

        let instruction = registry
            .on_verdict(&gateway, id, &alice, true, score(40))
            .unwrap();
        assert!(instruction.is_none());

        let completion = registry.get_completion(id, &alice).unwrap();
        assert!(completion.verified);
        assert!(!completion.settled);

        // A replayed verdict is still a no-op and still does not settle.
        let replay = registry
            .on_verdict(&gateway, id, &alice, true, score(90))
            .unwrap();
        assert!(replay.is_none());
    }

    #[test]
    fn negative_verdict_records_score_without_verifying() {
        let (mut registry, admin, gateway) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        let alice = addr("alice");
        registry
            .submit_completion(id, &alice, vec![], in_window())
            .unwrap();

        let instruction = registry
            .on_verdict(&gateway, id, &alice, false, score(95))
            .unwrap();
        assert!(instruction.is_none());

        let completion = registry.get_completion(id, &alice).unwrap();
        assert!(!completion.verified);
        assert_eq!(completion.risk_score, Some(score(95)));
    }

    #[test]
    fn snapshot_roundtrip_preserves_latch() {
        let (mut registry, admin, gateway) = setup();
        let id = registry.create_task(&admin, spec(), in_window()).unwrap();
        let alice = addr("alice");
        registry
            .submit_completion(id, &alice, vec![], in_window())
            .unwrap();
        registry
            .on_verdict(&gateway, id, &alice, true, score(80))
            .unwrap();

        let bytes = bincode::serialize(&registry.snapshot()).unwrap();
        let mut restored = TaskRegistry::restore(bincode::deserialize(&bytes).unwrap());

        // The latch survives the restart: a replayed verdict cannot pay.
        let replay = restored
            .on_verdict(&gateway, id, &alice, true, score(80))
            .unwrap();
        assert!(replay.is_none());
        assert_eq!(restored.task_count(), 1);
    }
}
