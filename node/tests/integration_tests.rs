//! Integration tests exercising the full pipeline:
//! task creation → completion → proof dispatch → verdict → settlement.
//!
//! These tests wire together components that are normally only connected
//! inside `node.rs`, verifying the system works end-to-end — not just
//! in isolation.

use std::sync::{Arc, Mutex};

use quest_gateway::{digest_proof, GatewayError, ProofDispatch, VerdictDelivery};
use quest_node::{Node, NodeConfig, NodeError, VerdictOutcome, VerifierHandle};
use quest_registry::{TaskError, TaskSpec, TaskStatus};
use quest_types::{Address, Amount, AssetId, ProofCategory, TaskCategory, TaskId, Timestamp};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn addr(s: &str) -> Address {
    Address::new(format!("qst_{s}"))
}

fn asset() -> AssetId {
    AssetId::from("USDQ")
}

/// Capturing transport: records every dispatch for the test to answer.
#[derive(Default)]
struct CapturingVerifier {
    dispatches: Mutex<Vec<ProofDispatch>>,
}

impl CapturingVerifier {
    fn take(&self) -> Vec<ProofDispatch> {
        std::mem::take(&mut self.dispatches.lock().unwrap())
    }
}

impl VerifierHandle for CapturingVerifier {
    fn deliver(&self, dispatch: ProofDispatch) {
        self.dispatches.lock().unwrap().push(dispatch);
    }
}

struct Harness {
    node: Node,
    admin: Address,
    verifier: Address,
    transport: Arc<CapturingVerifier>,
    nonce: u64,
    _data_dir: tempfile::TempDir,
}

impl Harness {
    async fn new() -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: data_dir.path().to_path_buf(),
            ..NodeConfig::default()
        };
        let admin = config.admin_address.clone();
        let node = Node::new(config).unwrap();
        let verifier = addr("verifier_service");

        node.add_supported_asset(&admin, asset()).await.unwrap();
        for category in [ProofCategory::SocialPost, ProofCategory::OnChainTx] {
            node.register_verifier(&admin, verifier.clone(), category)
                .await
                .unwrap();
        }
        let transport = Arc::new(CapturingVerifier::default());
        node.attach_verifier(verifier.clone(), transport.clone())
            .await;

        Self {
            node,
            admin,
            verifier,
            transport,
            nonce: 0,
            _data_dir: data_dir,
        }
    }

    fn spec(reward: u128, cap: u32, min_score: u8) -> TaskSpec {
        let now = Timestamp::now().as_secs();
        TaskSpec {
            advertiser: addr("advertiser"),
            category: TaskCategory::Social,
            reward: Amount::new(reward),
            asset: asset(),
            max_participants: cap,
            start: Timestamp::new(now.saturating_sub(60)),
            end: Timestamp::new(now + 3600),
            criteria: "follow and repost".into(),
            kyc_required: false,
            min_score,
        }
    }

    async fn create_task(&self, reward: u128, cap: u32, min_score: u8) -> TaskId {
        self.node
            .create_task(&self.admin, Self::spec(reward, cap, min_score))
            .await
            .unwrap()
    }

    /// Answer the latest dispatch as the verifier would.
    async fn answer(
        &mut self,
        dispatch: &ProofDispatch,
        verified: bool,
        score: u8,
    ) -> Result<VerdictOutcome, NodeError> {
        self.nonce += 1;
        self.node
            .deliver_verdict(
                &self.verifier,
                VerdictDelivery {
                    request_id: dispatch.request_id,
                    verified,
                    risk_score: score,
                    proof_digest: digest_proof(&dispatch.proof),
                    nonce: self.nonce,
                },
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// 1. Single participant, no referrer — the canonical happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_participant_flow_settles_and_guards_repeat() {
    let mut h = Harness::new().await;
    let task = h.create_task(100, 1, 50).await;
    h.node.deposit(&asset(), Amount::new(1_000)).await.unwrap();

    let alice = addr("alice");
    h.node
        .submit_completion(task, &alice, b"post-url".to_vec())
        .await
        .unwrap();

    let dispatches = h.transport.take();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].category, ProofCategory::SocialPost);

    let outcome = h.answer(&dispatches[0], true, 80).await.unwrap();
    let record = match outcome {
        VerdictOutcome::Settled(record) => record,
        other => panic!("expected settlement, got {other:?}"),
    };

    // No referrer: participant share to Alice, everything else to platform.
    assert_eq!(record.gross_amount, Amount::new(100));
    assert_eq!(record.participant_share, Amount::new(60));
    assert_eq!(record.referrer_share, Amount::new(0));
    assert_eq!(record.platform_share, Amount::new(40));
    let platform = h.node.config().platform_address.clone();
    assert_eq!(h.node.balance_of(&alice, &asset()).await, 60);
    assert_eq!(h.node.balance_of(&platform, &asset()).await, 40);

    // A second submission by Alice is a duplicate, not "task full".
    let repeat = h
        .node
        .submit_completion(task, &alice, b"post-url".to_vec())
        .await;
    assert!(matches!(
        repeat,
        Err(NodeError::Task(TaskError::DuplicateCompletion { .. }))
    ));

    // A different participant hits the cap.
    let blocked = h.node.submit_completion(task, &addr("bob"), vec![]).await;
    assert!(matches!(
        blocked,
        Err(NodeError::Task(TaskError::TaskFull { .. }))
    ));
}

// ---------------------------------------------------------------------------
// 2. Verified but below the risk threshold — no payout, replay rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_score_verdict_verifies_without_settling() {
    let mut h = Harness::new().await;
    let task = h.create_task(100, 5, 50).await;
    h.node.deposit(&asset(), Amount::new(1_000)).await.unwrap();

    let alice = addr("alice");
    h.node
        .submit_completion(task, &alice, b"proof".to_vec())
        .await
        .unwrap();
    let dispatch = h.transport.take().remove(0);

    let outcome = h.answer(&dispatch, true, 40).await.unwrap();
    assert!(matches!(outcome, VerdictOutcome::Recorded));
    assert_eq!(h.node.balance_of(&alice, &asset()).await, 0);

    // Re-delivery of the same verdict is caught at the gateway.
    let replay = h.answer(&dispatch, true, 40).await;
    assert!(matches!(
        replay,
        Err(NodeError::Gateway(GatewayError::AlreadyProcessed(_)))
    ));
    assert_eq!(h.node.balance_of(&alice, &asset()).await, 0);
    assert!(h.node.drain_audit_records().await.is_empty());
}

// ---------------------------------------------------------------------------
// 3. Full three-tier referral chain settlement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn referral_chain_receives_exact_split() {
    let mut h = Harness::new().await;
    let task = h.create_task(10_000, 5, 50).await;
    h.node
        .deposit(&asset(), Amount::new(100_000))
        .await
        .unwrap();

    // a ← b ← c ← dana: dana's chain is c (direct), b, a.
    let (a, b, c, dana) = (addr("a"), addr("b"), addr("c"), addr("dana"));
    let code_a = h.node.issue_referral_code(&a).await.unwrap();
    h.node.register_referral(&b, &code_a).await.unwrap();
    let code_b = h.node.issue_referral_code(&b).await.unwrap();
    h.node.register_referral(&c, &code_b).await.unwrap();
    let code_c = h.node.issue_referral_code(&c).await.unwrap();
    h.node.register_referral(&dana, &code_c).await.unwrap();

    h.node
        .submit_completion(task, &dana, b"proof".to_vec())
        .await
        .unwrap();
    let dispatch = h.transport.take().remove(0);
    let outcome = h.answer(&dispatch, true, 95).await.unwrap();
    assert!(matches!(outcome, VerdictOutcome::Settled(_)));

    assert_eq!(h.node.balance_of(&dana, &asset()).await, 6_000);
    assert_eq!(h.node.balance_of(&c, &asset()).await, 2_000);
    assert_eq!(h.node.balance_of(&b, &asset()).await, 600);
    assert_eq!(h.node.balance_of(&a, &asset()).await, 600);

    let records = h.node.drain_audit_records().await;
    assert_eq!(records.len(), 1);
    assert!(records[0].is_balanced());
    assert_eq!(records[0].transfers.len(), 5);
}

// ---------------------------------------------------------------------------
// 4. Underfunded pool defers, deposit + retry settles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn underfunded_settlement_defers_then_retries() {
    let mut h = Harness::new().await;
    let task = h.create_task(500, 5, 50).await;

    let alice = addr("alice");
    h.node
        .submit_completion(task, &alice, b"proof".to_vec())
        .await
        .unwrap();
    let dispatch = h.transport.take().remove(0);

    // Pool is empty: the verdict lands, the payout is owed.
    let outcome = h.answer(&dispatch, true, 90).await.unwrap();
    assert!(matches!(outcome, VerdictOutcome::Deferred));
    assert_eq!(h.node.balance_of(&alice, &asset()).await, 0);

    // Nothing to retry while the pool stays empty.
    assert!(h.node.retry_owed().await.unwrap().is_empty());

    h.node.deposit(&asset(), Amount::new(10_000)).await.unwrap();
    let settled = h.node.retry_owed().await.unwrap();
    assert_eq!(settled.len(), 1);
    assert_eq!(h.node.balance_of(&alice, &asset()).await, 300);
    assert_eq!(h.node.drain_audit_records().await.len(), 1);

    // The owed queue drained; a second retry is a no-op.
    assert!(h.node.retry_owed().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// 5. Cap admits exactly max participants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cap_admits_exactly_n_participants() {
    let h = Harness::new().await;
    let task = h.create_task(100, 3, 50).await;

    for i in 0..3 {
        h.node
            .submit_completion(task, &addr(&format!("p{i}")), vec![])
            .await
            .unwrap();
    }
    let result = h.node.submit_completion(task, &addr("p3"), vec![]).await;
    assert!(matches!(
        result,
        Err(NodeError::Task(TaskError::TaskFull { cap: 3, .. }))
    ));
    assert_eq!(h.transport.take().len(), 3);
}

// ---------------------------------------------------------------------------
// 6. Paused task stops submissions; reopening restores them
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pause_halts_future_completions_only() {
    let mut h = Harness::new().await;
    let task = h.create_task(100, 5, 50).await;
    h.node.deposit(&asset(), Amount::new(1_000)).await.unwrap();

    let alice = addr("alice");
    h.node
        .submit_completion(task, &alice, vec![])
        .await
        .unwrap();
    let dispatch = h.transport.take().remove(0);

    h.node
        .set_task_status(&h.admin, task, TaskStatus::Paused)
        .await
        .unwrap();

    let blocked = h.node.submit_completion(task, &addr("bob"), vec![]).await;
    assert!(matches!(
        blocked,
        Err(NodeError::Task(TaskError::TaskNotActive { .. }))
    ));

    // The in-flight verdict still lands and settles: pausing halts
    // future completions, it never retracts recorded ones.
    let outcome = h.answer(&dispatch, true, 80).await.unwrap();
    assert!(matches!(outcome, VerdictOutcome::Settled(_)));

    h.node
        .set_task_status(&h.admin, task, TaskStatus::Active)
        .await
        .unwrap();
    h.node
        .submit_completion(task, &addr("bob"), vec![])
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// 7. Submission with no verifier registered fails without side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unverifiable_category_burns_nothing() {
    let h = Harness::new().await;
    let admin = h.admin.clone();

    // A custom-category task whose proofs nobody can check.
    let mut spec = Harness::spec(100, 1, 50);
    spec.category = TaskCategory::Custom;
    let task = h.node.create_task(&admin, spec).await.unwrap();

    let alice = addr("alice");
    let result = h.node.submit_completion(task, &alice, vec![]).await;
    assert!(matches!(
        result,
        Err(NodeError::Gateway(GatewayError::NoVerifierForCategory(
            ProofCategory::Custom
        )))
    ));

    // The failed submission must not have consumed Alice's slot.
    h.node
        .register_verifier(&admin, h.verifier.clone(), ProofCategory::Custom)
        .await
        .unwrap();
    h.node
        .submit_completion(task, &alice, vec![])
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// 8. State survives a save/restore cycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_restart_preserves_latch_and_balances() {
    let mut h = Harness::new().await;
    let task = h.create_task(100, 2, 50).await;
    h.node.deposit(&asset(), Amount::new(1_000)).await.unwrap();

    let alice = addr("alice");
    h.node
        .submit_completion(task, &alice, b"proof".to_vec())
        .await
        .unwrap();
    let dispatch = h.transport.take().remove(0);
    h.answer(&dispatch, true, 80).await.unwrap();

    h.node.save_state().await.unwrap();
    let restored = Node::load_or_new(h.node.config().clone()).unwrap();

    assert_eq!(restored.balance_of(&alice, &asset()).await, 60);

    // The processed flag survived: replaying the verdict is rejected.
    let replay = restored
        .deliver_verdict(
            &h.verifier,
            VerdictDelivery {
                request_id: dispatch.request_id,
                verified: true,
                risk_score: 80,
                proof_digest: digest_proof(&dispatch.proof),
                nonce: h.nonce + 1,
            },
        )
        .await;
    assert!(matches!(
        replay,
        Err(NodeError::Gateway(GatewayError::AlreadyProcessed(_)))
    ));
}
