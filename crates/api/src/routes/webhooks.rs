//! Webhook route

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use dispatcher::{DispatchResult, WebhookRequest};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct WebhookResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `POST /api/webhook` — hand the raw delivery to the dispatcher.
///
/// Signature failures get a 401 rather than the uniform 200 some bots
/// return; GitHub surfaces the status in the delivery log, which makes
/// misconfigured secrets visible. Handler failures are still acknowledged
/// with 200 so GitHub does not redeliver.
pub async fn github(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let request = WebhookRequest {
        body: body.to_vec(),
        event: header(&headers, "X-GitHub-Event"),
        signature: header(&headers, "X-Hub-Signature-256"),
        delivery: header(&headers, "X-GitHub-Delivery"),
    };

    let (status, ok, message) = match state.dispatcher.dispatch(&request).await {
        DispatchResult::Rejected(_) => (
            StatusCode::UNAUTHORIZED,
            false,
            Some("invalid webhook signature".to_string()),
        ),
        DispatchResult::Malformed(detail) => (StatusCode::BAD_REQUEST, false, Some(detail)),
        DispatchResult::Ignored => (StatusCode::OK, true, Some("event ignored".to_string())),
        DispatchResult::Completed => (StatusCode::OK, true, None),
        DispatchResult::HandlerFailed => (
            StatusCode::OK,
            false,
            Some("handler failed, event acknowledged".to_string()),
        ),
    };
    (status, Json(WebhookResponse { ok, message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, routing::post, Router};
    use dispatcher::{
        ClientFactory, DispatchContext, Dispatcher, EventHandler, HandlerError, HandlerRegistry,
        TracingObserver,
    };
    use github::verify::sign;
    use github::{AuthError, GitHubClient};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    const OPENED_BODY: &[u8] = br#"{"action":"opened","pull_request":{"number":42,"title":"Fix bug"},"repository":{"name":"r","owner":{"login":"o"}}}"#;

    struct NullFactory;

    #[async_trait]
    impl ClientFactory for NullFactory {
        async fn client_for(
            &self,
            _installation_id: Option<i64>,
        ) -> Result<GitHubClient, AuthError> {
            Ok(GitHubClient::new(None))
        }
    }

    struct OkHandler;

    #[async_trait]
    impl EventHandler for OkHandler {
        async fn handle(&self, _ctx: DispatchContext<'_>) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn test_app(registry: HandlerRegistry) -> Router {
        let dispatcher = Dispatcher::new(
            SECRET,
            registry,
            Arc::new(NullFactory),
            Arc::new(TracingObserver),
        );
        Router::new()
            .route("/api/webhook", post(github))
            .with_state(Arc::new(AppState { dispatcher }))
    }

    fn webhook_request(event: &str, body: &[u8], signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhook")
            .header("X-GitHub-Event", event)
            .header("X-Hub-Signature-256", signature)
            .header("X-GitHub-Delivery", "d-1")
            .body(Body::from(body.to_vec()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_delivery_responds_200() {
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), Arc::new(OkHandler));
        let app = test_app(registry);

        let response = app
            .oneshot(webhook_request(
                "pull_request",
                OPENED_BODY,
                &sign(SECRET, OPENED_BODY),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_zeroed_signature_responds_401() {
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), Arc::new(OkHandler));
        let app = test_app(registry);

        let zeros = format!("sha256={}", "0".repeat(64));
        let response = app
            .oneshot(webhook_request("pull_request", OPENED_BODY, &zeros))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unhandled_event_acknowledged_with_200() {
        let app = test_app(HandlerRegistry::new());

        let body: &[u8] = br#"{"zen":"Keep it logically awesome."}"#;
        let response = app
            .oneshot(webhook_request("ping", body, &sign(SECRET, body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_json_responds_400() {
        let app = test_app(HandlerRegistry::new());

        let body: &[u8] = b"not json";
        let response = app
            .oneshot(webhook_request("pull_request", body, &sign(SECRET, body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
