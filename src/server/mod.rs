//! HTTP entry points
//!
//! - [`dispatch`]: accepts launch requests and fans them out to the topic
//! - [`worker`]: Pub/Sub push endpoint acknowledging each message and running
//!   its invocation in the background
//!
//! Both expose `GET /healthz`.

pub mod dispatch;
pub mod worker;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use query_bench_core::LoadError;
use serde::Serialize;
use tokio::net::TcpListener;

#[derive(Debug, Serialize)]
struct ErrorResponseBody {
    error: String,
}

/// Error returned by a handler, rendered as `{"error": ...}`
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    /// 400 with a descriptive message
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LoadError> for HttpError {
    fn from(err: LoadError) -> Self {
        let status = match &err {
            LoadError::Validation(_) => StatusCode::BAD_REQUEST,
            LoadError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LoadError::Publish { .. } => StatusCode::BAD_GATEWAY,
            LoadError::Configuration(_)
            | LoadError::NoTemplatesAvailable
            | LoadError::UnboundPlaceholder { .. }
            | LoadError::MalformedTemplate { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %err, status = status.as_u16(), "request failed");
        } else {
            tracing::warn!(error = %err, "request rejected");
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponseBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Liveness check
pub async fn healthz() -> &'static str {
    "ok"
}

/// Serve `router` on `addr` until Ctrl+C
///
/// In-flight requests are allowed to finish before returning.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, draining in-flight requests..."),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
