//! Tests for the Orchestrator module

use super::aggregator::aggregate_cycle_stats;
use super::builder::OrchestratorBuilder;
use super::executor::OrchestratorState;
use crate::config::RunConfig;
use crate::descriptor::TestDescriptor;
use crate::testing::MockEngine;
use crate::worker::{CycleStats, UnitOutcome};

use std::sync::Arc;
use std::time::Duration;

fn queries(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("SELECT {i}")).collect()
}

fn builder(engine: Arc<MockEngine>) -> OrchestratorBuilder {
    OrchestratorBuilder::new()
        .project_id("p1")
        .test_id("t1")
        .engine(engine)
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_builder_requires_engine() {
    let err = OrchestratorBuilder::new()
        .project_id("p1")
        .test_id("t1")
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("query engine not set"));
}

#[test]
fn test_builder_requires_ids() {
    let engine = Arc::new(MockEngine::new());

    let err = OrchestratorBuilder::new()
        .test_id("t1")
        .engine(engine.clone())
        .build()
        .unwrap_err();
    assert!(err.is_validation());

    let err = OrchestratorBuilder::new()
        .project_id("p1")
        .engine(engine)
        .build()
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_builder_rejects_zero_cycles_and_concurrency() {
    let engine = Arc::new(MockEngine::new());
    assert!(builder(engine.clone()).cycles(0).build().is_err());
    assert!(builder(engine).concurrency(0).build().is_err());
}

#[test]
fn test_builder_rejects_concurrency_above_permit_limit() {
    let engine = Arc::new(MockEngine::new());
    let err = builder(engine)
        .concurrency(crate::config::MAX_CONCURRENCY + 1)
        .build()
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_builder_from_descriptor() {
    let descriptor = TestDescriptor {
        n_queries: 4,
        n_functions: 1,
        bucket_name: "b".into(),
        concurrency: 2,
        cycles: 3,
        wait_time: Duration::from_secs(5),
        test_id: "t9".into(),
        project_id: "p9".into(),
    };

    let orchestrator = OrchestratorBuilder::new()
        .descriptor(&descriptor)
        .queries(queries(4))
        .engine(Arc::new(MockEngine::new()))
        .build()
        .unwrap();

    assert_eq!(
        orchestrator.config(),
        &RunConfig::new(2)
            .with_cycles(3)
            .with_wait_time(Duration::from_secs(5))
    );
    assert_eq!(orchestrator.queries().len(), 4);
    let debug = format!("{orchestrator:?}");
    assert!(debug.contains("t9"));
    assert!(debug.contains("p9"));
}

// ============================================================================
// Cycles
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cycles_are_barriered_and_paced() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_secs(1)));
    let orchestrator = builder(engine.clone())
        .concurrency(2)
        .cycles(3)
        .wait_time(Duration::from_secs(5))
        .queries(queries(4))
        .build()
        .unwrap();

    let start = tokio::time::Instant::now();
    let summary = orchestrator.run().await;

    assert_eq!(summary.completed_cycles(), 3);
    assert!(!summary.interrupted);
    assert_eq!(engine.calls(), 12);
    assert!(engine.max_in_flight() <= 2);

    for (i, cycle) in summary.cycles.iter().enumerate() {
        assert_eq!(cycle.stats.cycle, i);
        assert_eq!(cycle.units.len(), 4);
        assert_eq!(cycle.stats.succeeded, 4);
        // 4 queries at concurrency 2 with a 1s engine
        assert_eq!(cycle.stats.elapsed(), Some(Duration::from_secs(2)));
    }

    for pair in summary.cycles.windows(2) {
        let ended = pair[0].stats.ended_at.unwrap();
        let started = pair[1].stats.started_at.unwrap();
        assert!(started.duration_since(ended) >= Duration::from_secs(5));
    }

    // 3 cycles of 2s plus 2 waits; no wait after the last cycle
    assert_eq!(start.elapsed(), Duration::from_secs(16));
}

#[tokio::test(start_paused = true)]
async fn test_every_query_labelled_and_uncached() {
    let engine = Arc::new(MockEngine::new());
    let orchestrator = builder(engine.clone())
        .cycles(2)
        .queries(queries(3))
        .build()
        .unwrap();

    orchestrator.run().await;

    let jobs = engine.jobs();
    assert_eq!(jobs.len(), 6);
    for job in jobs {
        assert_eq!(job.project_id, "p1");
        assert_eq!(job.labels.get("test_id").map(String::as_str), Some("t1"));
        assert!(!job.use_query_cache);
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_query_does_not_abort_cycle_or_run() {
    let engine = Arc::new(MockEngine::new().failing_on("SELECT 1"));
    let orchestrator = builder(engine.clone())
        .cycles(2)
        .queries(queries(3))
        .build()
        .unwrap();

    let summary = orchestrator.run().await;

    assert_eq!(summary.completed_cycles(), 2);
    for cycle in &summary.cycles {
        assert_eq!(cycle.stats.succeeded, 2);
        assert_eq!(cycle.stats.failed, 1);
        assert!(matches!(cycle.units[1].outcome, UnitOutcome::Failed { .. }));
    }
    assert_eq!(engine.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_query_releases_barrier() {
    let engine = Arc::new(MockEngine::new().hanging_on("SELECT 0"));
    let orchestrator = builder(engine)
        .queries(queries(2))
        .build()
        .unwrap();

    let start = tokio::time::Instant::now();
    let summary = orchestrator.run().await;

    let cycle = &summary.cycles[0];
    assert_eq!(cycle.stats.timed_out, 1);
    assert_eq!(cycle.stats.succeeded, 1);
    assert_eq!(cycle.units[0].outcome, UnitOutcome::TimedOut);
    assert_eq!(start.elapsed(), Duration::from_secs(120));
}

#[tokio::test]
async fn test_panicking_unit_recorded_as_failure() {
    let engine = Arc::new(MockEngine::new().panicking_on("SELECT 0"));
    let orchestrator = builder(engine)
        .queries(queries(3))
        .build()
        .unwrap();

    let summary = orchestrator.run().await;

    let cycle = &summary.cycles[0];
    assert_eq!(cycle.stats.failed, 1);
    assert_eq!(cycle.stats.succeeded, 2);
    assert_eq!(cycle.units[0].unit, 0);
    assert!(matches!(cycle.units[0].outcome, UnitOutcome::Failed { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_still_runs_cycles() {
    let engine = Arc::new(MockEngine::new());
    let orchestrator = builder(engine.clone())
        .cycles(2)
        .wait_time(Duration::from_secs(1))
        .build()
        .unwrap();

    let summary = orchestrator.run().await;

    assert_eq!(summary.completed_cycles(), 2);
    assert_eq!(summary.aggregate().total_units(), 0);
    assert_eq!(engine.calls(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_wait_skips_remaining_cycles() {
    let engine = Arc::new(MockEngine::new());
    let orchestrator = Arc::new(
        builder(engine.clone())
            .cycles(5)
            .wait_time(Duration::from_secs(60))
            .queries(queries(2))
            .build()
            .unwrap(),
    );

    let mut state = orchestrator.state();
    let runner = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run().await })
    };

    state
        .wait_for(|s| matches!(s, OrchestratorState::Waiting { cycle: 0 }))
        .await
        .unwrap();
    orchestrator.shutdown();

    let summary = runner.await.unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.completed_cycles(), 1);
    assert_eq!(engine.calls(), 2);
    assert_eq!(*orchestrator.state().borrow(), OrchestratorState::Done);
}

#[tokio::test(start_paused = true)]
async fn test_state_idle_then_done() {
    let orchestrator = builder(Arc::new(MockEngine::new()))
        .queries(queries(1))
        .build()
        .unwrap();

    assert_eq!(*orchestrator.state().borrow(), OrchestratorState::Idle);
    orchestrator.run().await;
    assert_eq!(*orchestrator.state().borrow(), OrchestratorState::Done);
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_empty() {
    let aggregated = aggregate_cycle_stats(&[]);
    assert_eq!(aggregated.total_cycles, 0);
    assert_eq!(aggregated.total_units(), 0);
    assert_eq!(aggregated.success_rate(), 0.0);
    assert_eq!(aggregated.failure_rate(), 0.0);
}

#[test]
fn test_aggregate_counts() {
    let mut a = CycleStats::new(0);
    a.succeeded = 3;
    a.failed = 1;
    let mut b = CycleStats::new(1);
    b.succeeded = 3;
    b.timed_out = 1;

    let aggregated = aggregate_cycle_stats(&[a, b]);
    assert_eq!(aggregated.total_cycles, 2);
    assert_eq!(aggregated.total_units(), 8);
    assert!((aggregated.success_rate() - 0.75).abs() < 0.001);
    assert!((aggregated.failure_rate() - 0.25).abs() < 0.001);
    // No timing recorded
    assert_eq!(aggregated.queries_per_second, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_summary_aggregate_qps() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_secs(2)));
    let orchestrator = builder(engine)
        .concurrency(4)
        .cycles(2)
        .wait_time(Duration::from_secs(10))
        .queries(queries(4))
        .build()
        .unwrap();

    let aggregated = orchestrator.run().await.aggregate();

    assert_eq!(aggregated.total_succeeded, 8);
    assert_eq!(aggregated.busy_duration, Duration::from_secs(4));
    assert!((aggregated.queries_per_second - 2.0).abs() < 0.001);
}
