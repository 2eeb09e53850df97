//! Dispatcher HTTP endpoint
//!
//! `POST /` with a JSON launch request; answers with the acknowledgement text.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use query_bench_core::{Dispatcher, LaunchRequest};

use super::{healthz, HttpError};

/// Build the dispatcher router
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/", post(launch_test))
        .route("/healthz", get(healthz))
        .with_state(dispatcher)
}

async fn launch_test(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Result<String, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(HttpError::bad_request("HTTP request body not present"));
    }

    let request: LaunchRequest = serde_json::from_slice(&body)
        .map_err(|e| HttpError::bad_request(format!("HTTP request body is not valid JSON: {e}")))?;

    let ack = dispatcher.launch(request).await?;
    tracing::info!(
        test_id = %ack.test_id,
        project_id = %ack.project_id,
        messages = ack.message_ids.len(),
        "Test launched"
    );
    Ok(ack.to_string())
}
