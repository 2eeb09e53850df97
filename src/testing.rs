//! Test doubles for the pipeline and server tests

use std::sync::Mutex;

use async_trait::async_trait;
use query_bench_core::{EngineError, QueryCompletion, QueryEngine, QueryJob};

/// Engine that records every query and succeeds immediately
#[derive(Default)]
pub(crate) struct RecordingEngine {
    jobs: Mutex<Vec<QueryJob>>,
}

impl RecordingEngine {
    pub(crate) fn sql(&self) -> Vec<String> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .map(|job| job.sql.clone())
            .collect()
    }

    pub(crate) fn jobs(&self) -> Vec<QueryJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for RecordingEngine {
    fn engine_name(&self) -> &str {
        "recording"
    }

    async fn execute(&self, job: &QueryJob) -> Result<QueryCompletion, EngineError> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        Ok(QueryCompletion {
            job_id: format!("job_{}", jobs.len()),
        })
    }
}
