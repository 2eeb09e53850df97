//! Pub/Sub publisher over the v1 REST API

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use query_bench_core::{MessagePublisher, PublishError, TopicPath};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{EndpointConfig, Service};
use crate::http::{api_error_message, authorize, endpoint_url};

/// Production REST endpoint
pub const DEFAULT_PUBSUB_BASE_URL: &str = "https://pubsub.googleapis.com/v1";

#[derive(Debug, Serialize)]
struct PublishRequest {
    messages: Vec<OutgoingMessage>,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage {
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Publishes messages with `topics.publish`
#[derive(Debug, Clone)]
pub struct PubSubPublisher {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl PubSubPublisher {
    /// Create a publisher against the production endpoint
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_PUBSUB_BASE_URL.to_string(),
            access_token: None,
        }
    }

    /// Create a publisher from endpoint configuration
    pub fn from_config(client: Client, config: &EndpointConfig) -> Self {
        let publisher = Self::new(client).with_base_url(config.base_url(Service::PubSub));
        match &config.access_token {
            Some(token) => publisher.with_access_token(token),
            None => publisher,
        }
    }

    /// Override the endpoint (emulators, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a bearer token with every request
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

#[async_trait]
impl MessagePublisher for PubSubPublisher {
    async fn publish(&self, topic: &TopicPath, data: &[u8]) -> Result<String, PublishError> {
        let action = format!("{}:publish", topic.topic);
        let url = endpoint_url(
            &self.base_url,
            &["projects", &topic.project, "topics", &action],
        )
        .map_err(PublishError::Transport)?;

        let body = PublishRequest {
            messages: vec![OutgoingMessage {
                data: STANDARD.encode(data),
            }],
        };

        let response = authorize(self.client.post(url), self.access_token.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: PublishResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))?;

        parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::Decode("response carries no message id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockPubSub {
        published: Arc<Mutex<Vec<(String, String, Value)>>>,
        deny: bool,
    }

    async fn publish(
        State(ps): State<MockPubSub>,
        Path((project, action)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> Response {
        if ps.deny {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": { "code": 403, "message": "User not authorized" } })),
            )
                .into_response();
        }
        let Some(topic) = action.strip_suffix(":publish") else {
            return StatusCode::NOT_FOUND.into_response();
        };

        let mut published = ps.published.lock().unwrap();
        published.push((project, topic.to_string(), body));
        Json(json!({ "messageIds": [published.len().to_string()] })).into_response()
    }

    async fn spawn(ps: MockPubSub) -> String {
        let app = Router::new()
            .route("/v1/projects/{project}/topics/{action}", post(publish))
            .with_state(ps);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn test_publish_encodes_data() {
        let ps = MockPubSub::default();
        let publisher = PubSubPublisher::new(Client::new()).with_base_url(spawn(ps.clone()).await);
        let topic = TopicPath::new("admin", "launch_queries");

        let first = publisher.publish(&topic, br#"{"a":1}"#).await.unwrap();
        let second = publisher.publish(&topic, b"second").await.unwrap();
        assert_eq!(first, "1");
        assert_eq!(second, "2");

        let published = ps.published.lock().unwrap();
        let (project, topic_name, body) = &published[0];
        assert_eq!(project, "admin");
        assert_eq!(topic_name, "launch_queries");

        let data = body["messages"][0]["data"].as_str().unwrap();
        assert_eq!(STANDARD.decode(data).unwrap(), br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_publish_denied() {
        let ps = MockPubSub {
            deny: true,
            ..Default::default()
        };
        let publisher = PubSubPublisher::new(Client::new()).with_base_url(spawn(ps).await);

        let err = publisher
            .publish(&TopicPath::new("admin", "t"), b"x")
            .await
            .unwrap_err();
        match err {
            PublishError::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "User not authorized");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
