//! Test doubles shared by the worker and orchestrator tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::traits::{EngineError, QueryCompletion, QueryEngine, QueryJob};

/// Engine that sleeps, then succeeds unless the SQL matches a failure rule
pub(crate) struct MockEngine {
    delay: Duration,
    fail_sql: Option<String>,
    hang_sql: Option<String>,
    panic_sql: Option<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    jobs: Mutex<Vec<QueryJob>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            fail_sql: None,
            hang_sql: None,
            panic_sql: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing_on(mut self, sql: &str) -> Self {
        self.fail_sql = Some(sql.to_string());
        self
    }

    pub(crate) fn hanging_on(mut self, sql: &str) -> Self {
        self.hang_sql = Some(sql.to_string());
        self
    }

    pub(crate) fn panicking_on(mut self, sql: &str) -> Self {
        self.panic_sql = Some(sql.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn jobs(&self) -> Vec<QueryJob> {
        self.jobs.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    fn engine_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, job: &QueryJob) -> Result<QueryCompletion, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().push(job.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if self.panic_sql.as_deref() == Some(job.sql.as_str()) {
            panic!("engine exploded");
        }

        if self.hang_sql.as_deref() == Some(job.sql.as_str()) {
            std::future::pending::<()>().await;
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_sql.as_deref() == Some(job.sql.as_str()) {
            return Err(EngineError::JobFailed {
                job_id: format!("job_{call}"),
                message: "Simulated failure".to_string(),
            });
        }

        Ok(QueryCompletion {
            job_id: format!("job_{call}"),
        })
    }
}
