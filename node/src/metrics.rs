//! Prometheus metrics for the QUEST node.
//!
//! Counters and gauges covering the completion → verdict → settlement
//! pipeline. The [`NodeMetrics`] struct owns a dedicated [`Registry`]
//! that an operator-facing exporter can encode into the Prometheus text
//! exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Total completions accepted by the task registry.
    pub completions_submitted: IntCounter,
    /// Total verdicts accepted by the gateway.
    pub verdicts_accepted: IntCounter,
    /// Total verdict deliveries rejected at the gateway boundary.
    pub verdicts_rejected: IntCounter,
    /// Total settlements executed (transfers performed).
    pub settlements_executed: IntCounter,
    /// Total settlements deferred for lack of pool balance.
    pub settlements_deferred: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Tasks currently accepting completions.
    pub active_tasks: IntGauge,
    /// Verification requests still awaiting a verdict.
    pub unprocessed_requests: IntGauge,
    /// Obligations waiting on pool funding.
    pub owed_obligations: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let completions_submitted = register_int_counter_with_registry!(
            Opts::new(
                "quest_completions_submitted_total",
                "Total completions accepted by the task registry"
            ),
            registry
        )
        .expect("failed to register completions_submitted counter");

        let verdicts_accepted = register_int_counter_with_registry!(
            Opts::new(
                "quest_verdicts_accepted_total",
                "Total verdicts accepted by the gateway"
            ),
            registry
        )
        .expect("failed to register verdicts_accepted counter");

        let verdicts_rejected = register_int_counter_with_registry!(
            Opts::new(
                "quest_verdicts_rejected_total",
                "Total verdict deliveries rejected at the gateway boundary"
            ),
            registry
        )
        .expect("failed to register verdicts_rejected counter");

        let settlements_executed = register_int_counter_with_registry!(
            Opts::new(
                "quest_settlements_executed_total",
                "Total settlements executed"
            ),
            registry
        )
        .expect("failed to register settlements_executed counter");

        let settlements_deferred = register_int_counter_with_registry!(
            Opts::new(
                "quest_settlements_deferred_total",
                "Total settlements deferred for lack of pool balance"
            ),
            registry
        )
        .expect("failed to register settlements_deferred counter");

        let active_tasks = register_int_gauge_with_registry!(
            Opts::new("quest_active_tasks", "Tasks currently accepting completions"),
            registry
        )
        .expect("failed to register active_tasks gauge");

        let unprocessed_requests = register_int_gauge_with_registry!(
            Opts::new(
                "quest_unprocessed_requests",
                "Verification requests awaiting a verdict"
            ),
            registry
        )
        .expect("failed to register unprocessed_requests gauge");

        let owed_obligations = register_int_gauge_with_registry!(
            Opts::new(
                "quest_owed_obligations",
                "Settlements waiting on pool funding"
            ),
            registry
        )
        .expect("failed to register owed_obligations gauge");

        Self {
            registry,
            completions_submitted,
            verdicts_accepted,
            verdicts_rejected,
            settlements_executed,
            settlements_deferred,
            active_tasks,
            unprocessed_requests,
            owed_obligations,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
