//! Tests for the query unit

use super::*;
use crate::config::QUERY_TIMEOUT;
use crate::testing::MockEngine;
use crate::traits::QueryJob;

use std::sync::Arc;
use std::time::Duration;

fn unit(engine: Arc<MockEngine>, sql: &str) -> QueryUnit {
    QueryUnit::new(3, 1, QueryJob::for_test("p1", sql, "t1"), engine, QUERY_TIMEOUT)
}

#[tokio::test]
async fn test_unit_success() {
    let engine = Arc::new(MockEngine::new());

    let report = unit(engine.clone(), "SELECT 1").run().await;

    assert_eq!(report.unit, 3);
    assert_eq!(
        report.outcome,
        UnitOutcome::Succeeded {
            job_id: "job_0".into()
        }
    );
    let jobs = engine.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].labels.get("test_id").map(String::as_str), Some("t1"));
    assert!(!jobs[0].use_query_cache);
}

#[tokio::test]
async fn test_unit_api_error_is_failed_outcome() {
    let engine = Arc::new(MockEngine::new().failing_on("SELECT bad"));

    let report = unit(engine, "SELECT bad").run().await;

    match report.outcome {
        UnitOutcome::Failed { error } => assert!(error.contains("Simulated failure")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_unit_times_out_after_fixed_timeout() {
    let engine = Arc::new(MockEngine::new().hanging_on("SELECT sleep"));

    let report = unit(engine, "SELECT sleep").run().await;

    assert_eq!(report.outcome, UnitOutcome::TimedOut);
    assert_eq!(report.elapsed, Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_unit_slow_query_within_timeout_succeeds() {
    let engine = Arc::new(MockEngine::new().with_delay(Duration::from_secs(119)));

    let report = unit(engine, "SELECT 1").run().await;

    assert!(matches!(report.outcome, UnitOutcome::Succeeded { .. }));
    assert_eq!(report.elapsed, Duration::from_secs(119));
}

#[test]
fn test_unit_report_failed_constructor() {
    let report = UnitReport::failed(7, "pool closed");
    assert_eq!(report.unit, 7);
    assert_eq!(report.elapsed, Duration::ZERO);
    assert!(matches!(report.outcome, UnitOutcome::Failed { .. }));
}

#[test]
fn test_unit_debug_format() {
    let engine = Arc::new(MockEngine::new());
    let debug = format!("{:?}", unit(engine, "SELECT 1"));
    assert!(debug.contains("QueryUnit"));
    assert!(debug.contains("mock"));
}
