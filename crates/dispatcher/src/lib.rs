//! Webhook verification and dispatch
//!
//! The pipeline for one inbound delivery: verify the signature over the raw
//! body, parse the envelope, look up a handler by `(event, action)`, and
//! invoke it with a per-dispatch API client. Handler failures are reported to
//! the observer and still acknowledged to the sender; GitHub retries on HTTP
//! failure only, and duplicate deliveries would mean duplicate comments.

pub mod dispatch;
pub mod envelope;
pub mod handler;
pub mod handlers;
pub mod observer;
pub mod registry;

pub use dispatch::{DispatchResult, Dispatcher, RejectReason};
pub use envelope::{EventEnvelope, WebhookRequest};
pub use handler::{ClientFactory, DispatchContext, EventHandler, HandlerError};
pub use handlers::{PrOpenedHandler, PrSynchronizeHandler, PushHandler};
pub use observer::{DispatchObserver, DispatchRecord, TracingObserver};
pub use registry::{HandlerRegistry, RoutingKey};
