//! The per-request dispatch pipeline

use std::sync::Arc;

use github::verify_signature;

use crate::envelope::{EventEnvelope, WebhookRequest};
use crate::handler::{ClientFactory, DispatchContext};
use crate::observer::{DispatchObserver, DispatchRecord};
use crate::registry::HandlerRegistry;

/// Why a delivery was rejected before any handler ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingSignature,
    BadSignature,
}

/// Terminal outcome of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Signature verification failed; no handler ran
    Rejected(RejectReason),
    /// Body was not valid JSON or a required routing field was missing
    Malformed(String),
    /// No handler registered for the event; acknowledged and dropped
    Ignored,
    /// Handler ran to completion
    Completed,
    /// Handler reported an error; already forwarded to the observer. The
    /// delivery is still acknowledged to the sender.
    HandlerFailed,
}

impl DispatchResult {
    /// Whether the sender should receive a success acknowledgment
    pub fn is_ack(&self) -> bool {
        matches!(
            self,
            Self::Ignored | Self::Completed | Self::HandlerFailed
        )
    }
}

/// Routes verified webhook deliveries to registered handlers.
///
/// All state is read-only after construction (secret, registry, injected
/// collaborators), so one dispatcher instance serves concurrent requests
/// without locking. API clients are created per dispatch and never shared.
pub struct Dispatcher {
    secret: String,
    registry: HandlerRegistry,
    factory: Arc<dyn ClientFactory>,
    observer: Arc<dyn DispatchObserver>,
}

impl Dispatcher {
    pub fn new(
        secret: impl Into<String>,
        registry: HandlerRegistry,
        factory: Arc<dyn ClientFactory>,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            secret: secret.into(),
            registry,
            factory,
            observer,
        }
    }

    /// Run one delivery through the pipeline: verify, parse, route, invoke.
    pub async fn dispatch(&self, request: &WebhookRequest) -> DispatchResult {
        self.observer.record(&DispatchRecord::Received {
            event: request.event.clone(),
            delivery: request.delivery.clone(),
        });

        // Verification runs on the raw bytes, before anything is parsed.
        let signature = match request.signature.as_deref() {
            Some(s) => s,
            None => return self.reject(RejectReason::MissingSignature),
        };
        if !verify_signature(signature, &self.secret, &request.body) {
            return self.reject(RejectReason::BadSignature);
        }
        self.observer.record(&DispatchRecord::Verified);

        let event = match request.event.as_deref() {
            Some(e) => e,
            None => return self.malformed("missing X-GitHub-Event header"),
        };

        let envelope = match EventEnvelope::parse(event, &request.body) {
            Ok(envelope) => envelope,
            Err(e) => return self.malformed(format!("invalid JSON body: {}", e)),
        };

        let handler = match self
            .registry
            .lookup(&envelope.event, envelope.action.as_deref())
        {
            Some(handler) => handler,
            None => {
                // GitHub sends many event types a deployment does not care
                // about; an unmatched event is a success, not an error.
                self.observer.record(&DispatchRecord::Ignored {
                    event: envelope.event.clone(),
                    action: envelope.action.clone(),
                });
                return DispatchResult::Ignored;
            }
        };
        self.observer.record(&DispatchRecord::Matched {
            event: envelope.event.clone(),
            action: envelope.action.clone(),
        });

        let client = match self.factory.client_for(envelope.installation_id()).await {
            Ok(client) => client,
            Err(e) => return self.handler_failed(&envelope.event, e.to_string()),
        };

        let ctx = DispatchContext {
            envelope: &envelope,
            client: &client,
        };
        match handler.handle(ctx).await {
            Ok(()) => {
                self.observer.record(&DispatchRecord::Completed {
                    event: envelope.event.clone(),
                });
                DispatchResult::Completed
            }
            Err(e) => self.handler_failed(&envelope.event, e.to_string()),
        }
    }

    fn reject(&self, reason: RejectReason) -> DispatchResult {
        self.observer.record(&DispatchRecord::Rejected { reason });
        DispatchResult::Rejected(reason)
    }

    fn malformed(&self, detail: impl Into<String>) -> DispatchResult {
        let detail = detail.into();
        self.observer.record(&DispatchRecord::Malformed {
            detail: detail.clone(),
        });
        DispatchResult::Malformed(detail)
    }

    fn handler_failed(&self, event: &str, error: String) -> DispatchResult {
        self.observer.record(&DispatchRecord::HandlerFailed {
            event: event.to_string(),
            error,
        });
        DispatchResult::HandlerFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{EventHandler, HandlerError};
    use async_trait::async_trait;
    use github::verify::sign;
    use github::{AuthError, GitHubClient};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const SECRET: &str = "test-secret";

    const OPENED_BODY: &[u8] = br#"{"action":"opened","pull_request":{"number":42,"title":"Fix bug"},"repository":{"name":"r","owner":{"login":"o"}}}"#;

    struct CountingFactory {
        calls: AtomicUsize,
    }

    impl CountingFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ClientFactory for CountingFactory {
        async fn client_for(
            &self,
            _installation_id: Option<i64>,
        ) -> Result<GitHubClient, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GitHubClient::new(None))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        records: Mutex<Vec<DispatchRecord>>,
    }

    impl DispatchObserver for RecordingObserver {
        fn record(&self, record: &DispatchRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    impl RecordingObserver {
        fn handler_failures(&self) -> usize {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| matches!(r, DispatchRecord::HandlerFailed { .. }))
                .count()
        }
    }

    /// Counts invocations and captures the PR number it saw
    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
        seen_pr_number: Mutex<Option<i64>>,
        seen_repo_name: Mutex<Option<String>>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, ctx: DispatchContext<'_>) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_pr_number.lock().unwrap() = ctx
                .envelope
                .payload
                .pointer("/pull_request/number")
                .and_then(|n| n.as_i64());
            *self.seen_repo_name.lock().unwrap() = ctx
                .envelope
                .payload
                .pointer("/repository/name")
                .and_then(|n| n.as_str())
                .map(str::to_string);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _ctx: DispatchContext<'_>) -> Result<(), HandlerError> {
            Err(HandlerError::Other("downstream call failed".to_string()))
        }
    }

    fn request(event: Option<&str>, body: &[u8], signature: Option<String>) -> WebhookRequest {
        WebhookRequest {
            body: body.to_vec(),
            event: event.map(str::to_string),
            signature,
            delivery: Some("d-1".to_string()),
        }
    }

    fn signed_request(event: &str, body: &[u8]) -> WebhookRequest {
        request(Some(event), body, Some(sign(SECRET, body)))
    }

    fn dispatcher(
        registry: HandlerRegistry,
        factory: Arc<CountingFactory>,
        observer: Arc<RecordingObserver>,
    ) -> Dispatcher {
        Dispatcher::new(SECRET, registry, factory, observer)
    }

    #[tokio::test]
    async fn test_unregistered_event_is_ignored_without_side_effects() {
        let handler = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), handler.clone());
        let factory = CountingFactory::new();
        let d = dispatcher(registry, factory.clone(), Arc::new(RecordingObserver::default()));

        let result = d
            .dispatch(&signed_request("workflow_run", br#"{"action":"completed"}"#))
            .await;

        assert_eq!(result, DispatchResult::Ignored);
        assert!(result.is_ack());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(factory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_opened_routes_to_opened_handler_with_parsed_fields() {
        let opened = Arc::new(CountingHandler::default());
        let synchronize = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), opened.clone());
        registry.register("pull_request", Some("synchronize"), synchronize.clone());
        let d = dispatcher(
            registry,
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        let result = d.dispatch(&signed_request("pull_request", OPENED_BODY)).await;

        assert_eq!(result, DispatchResult::Completed);
        assert_eq!(opened.calls.load(Ordering::SeqCst), 1);
        assert_eq!(synchronize.calls.load(Ordering::SeqCst), 0);
        assert_eq!(*opened.seen_pr_number.lock().unwrap(), Some(42));
        assert_eq!(
            opened.seen_repo_name.lock().unwrap().as_deref(),
            Some("r")
        );
    }

    #[tokio::test]
    async fn test_synchronize_routes_to_synchronize_handler_only() {
        let opened = Arc::new(CountingHandler::default());
        let synchronize = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), opened.clone());
        registry.register("pull_request", Some("synchronize"), synchronize.clone());
        let d = dispatcher(
            registry,
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        let body = br#"{"action":"synchronize","pull_request":{"number":42,"title":"Fix bug"},"repository":{"name":"r","owner":{"login":"o"}}}"#;
        let result = d.dispatch(&signed_request("pull_request", body)).await;

        assert_eq!(result, DispatchResult::Completed);
        assert_eq!(opened.calls.load(Ordering::SeqCst), 0);
        assert_eq!(synchronize.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_rejected_before_any_handler() {
        let handler = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), handler.clone());
        let factory = CountingFactory::new();
        let d = dispatcher(registry, factory.clone(), Arc::new(RecordingObserver::default()));

        let zeros = format!("sha256={}", "0".repeat(64));
        let result = d
            .dispatch(&request(Some("pull_request"), OPENED_BODY, Some(zeros)))
            .await;

        assert_eq!(result, DispatchResult::Rejected(RejectReason::BadSignature));
        assert!(!result.is_ack());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(factory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_rejected() {
        let factory = CountingFactory::new();
        let d = dispatcher(
            HandlerRegistry::new(),
            factory.clone(),
            Arc::new(RecordingObserver::default()),
        );

        let result = d
            .dispatch(&request(Some("pull_request"), OPENED_BODY, None))
            .await;

        assert_eq!(
            result,
            DispatchResult::Rejected(RejectReason::MissingSignature)
        );
        assert_eq!(factory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let d = dispatcher(
            HandlerRegistry::new(),
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        let body = b"not json";
        let result = d.dispatch(&signed_request("pull_request", body)).await;

        assert!(matches!(result, DispatchResult::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_event_header_is_malformed() {
        let d = dispatcher(
            HandlerRegistry::new(),
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        let result = d
            .dispatch(&request(None, OPENED_BODY, Some(sign(SECRET, OPENED_BODY))))
            .await;

        assert!(matches!(result, DispatchResult::Malformed(_)));
    }

    #[tokio::test]
    async fn test_handler_failure_is_acknowledged_and_observed_once() {
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), Arc::new(FailingHandler));
        let observer = Arc::new(RecordingObserver::default());
        let d = dispatcher(registry, CountingFactory::new(), observer.clone());

        let result = d.dispatch(&signed_request("pull_request", OPENED_BODY)).await;

        assert_eq!(result, DispatchResult::HandlerFailed);
        assert!(result.is_ack());
        assert_eq!(observer.handler_failures(), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_poison_later_dispatches() {
        let ok = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), Arc::new(FailingHandler));
        registry.register("pull_request", Some("synchronize"), ok.clone());
        let d = dispatcher(
            registry,
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        assert_eq!(
            d.dispatch(&signed_request("pull_request", OPENED_BODY)).await,
            DispatchResult::HandlerFailed
        );

        let body = br#"{"action":"synchronize","pull_request":{"number":1,"title":"t"},"repository":{"name":"r","owner":{"login":"o"}}}"#;
        assert_eq!(
            d.dispatch(&signed_request("pull_request", body)).await,
            DispatchResult::Completed
        );
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_action_less_registration_catches_all_actions() {
        let catch_all = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", None, catch_all.clone());
        let d = dispatcher(
            registry,
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        let result = d.dispatch(&signed_request("pull_request", OPENED_BODY)).await;

        assert_eq!(result, DispatchResult::Completed);
        assert_eq!(catch_all.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let first = Arc::new(CountingHandler::default());
        let second = Arc::new(CountingHandler::default());
        let mut registry = HandlerRegistry::new();
        registry.register("pull_request", Some("opened"), first.clone());
        registry.register("pull_request", Some("opened"), second.clone());
        assert_eq!(registry.len(), 1);
        let d = dispatcher(
            registry,
            CountingFactory::new(),
            Arc::new(RecordingObserver::default()),
        );

        d.dispatch(&signed_request("pull_request", OPENED_BODY)).await;

        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }
}
