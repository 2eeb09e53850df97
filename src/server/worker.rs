//! Worker HTTP endpoint (Pub/Sub push subscription)
//!
//! `POST /` receives a push envelope and always acknowledges it. Pub/Sub
//! redelivers anything that is not acknowledged within the ack deadline, so
//! the reply never waits for the run:
//!
//! - `202` when the descriptor is valid; the run continues as a tracked
//!   background task and its outcome is logged
//! - `204` when the message can never succeed (bad envelope, missing data,
//!   invalid descriptor); the message is logged and dropped

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use query_bench_core::{LoadError, LoadResult, TestDescriptor};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};

use super::healthz;
use crate::launch::Launcher;

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    message: PushMessage,
    #[serde(default)]
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    publish_time: Option<String>,
}

/// Launcher plus the runs it has accepted and not yet finished
#[derive(Debug)]
pub struct WorkerState {
    launcher: Arc<Launcher>,
    runs: Mutex<JoinSet<()>>,
}

impl WorkerState {
    /// Create the worker state
    pub fn new(launcher: Launcher) -> Self {
        Self {
            launcher: Arc::new(launcher),
            runs: Mutex::new(JoinSet::new()),
        }
    }

    /// Number of accepted runs still in progress
    pub async fn in_flight(&self) -> usize {
        let mut runs = self.runs.lock().await;
        while let Some(finished) = runs.try_join_next() {
            log_join(finished);
        }
        runs.len()
    }

    /// Wait for every accepted run to finish
    pub async fn drain(&self) {
        let mut runs = std::mem::take(&mut *self.runs.lock().await);
        if !runs.is_empty() {
            tracing::info!(runs = runs.len(), "Waiting for accepted runs");
        }
        while let Some(finished) = runs.join_next().await {
            log_join(finished);
        }
    }

    async fn start(&self, descriptor: TestDescriptor) {
        let launcher = Arc::clone(&self.launcher);
        let mut runs = self.runs.lock().await;
        while let Some(finished) = runs.try_join_next() {
            log_join(finished);
        }

        runs.spawn(async move {
            match launcher.run(&descriptor).await {
                Ok(summary) => {
                    let aggregated = summary.aggregate();
                    tracing::info!(
                        test_id = %summary.test_id,
                        cycles = aggregated.total_cycles,
                        succeeded = aggregated.total_succeeded,
                        failed = aggregated.total_failed,
                        timed_out = aggregated.total_timed_out,
                        "Invocation finished"
                    );
                }
                Err(e) => {
                    tracing::error!(test_id = %descriptor.test_id, error = %e, "Invocation failed");
                }
            }
        });
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Invocation task aborted");
    }
}

/// Build the worker router
pub fn router(state: Arc<WorkerState>) -> Router {
    Router::new()
        .route("/", post(receive))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn receive(State(worker): State<Arc<WorkerState>>, body: Bytes) -> StatusCode {
    match decode(&body) {
        Ok(descriptor) => {
            worker.start(descriptor).await;
            StatusCode::ACCEPTED
        }
        Err(e) => {
            tracing::error!(error = %e, "Dropping launch message");
            StatusCode::NO_CONTENT
        }
    }
}

fn decode(body: &[u8]) -> LoadResult<TestDescriptor> {
    let envelope: PushEnvelope = serde_json::from_slice(body)
        .map_err(|e| LoadError::validation(format!("invalid push envelope: {e}")))?;

    tracing::info!(
        message_id = envelope.message.message_id.as_deref().unwrap_or("-"),
        publish_time = envelope.message.publish_time.as_deref().unwrap_or("-"),
        subscription = envelope.subscription.as_deref().unwrap_or("-"),
        "Invocation triggered"
    );

    let data = envelope
        .message
        .data
        .ok_or_else(|| LoadError::validation("data not present in Pub/Sub message"))?;
    let payload = STANDARD
        .decode(data.trim())
        .map_err(|e| LoadError::validation(format!("message data is not valid base64: {e}")))?;

    TestDescriptor::from_payload(&payload)
}
