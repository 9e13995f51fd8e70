//! Dispatch observability
//!
//! The dispatcher reports every state transition through an injected
//! observer rather than logging directly, so tests can assert on the emitted
//! records. Production wires [`TracingObserver`]. Records are fire-and-forget;
//! there is no backpressure contract.

use tracing::{debug, error, info, warn};

use crate::dispatch::RejectReason;

/// One dispatch state transition
#[derive(Debug, Clone)]
pub enum DispatchRecord {
    Received {
        event: Option<String>,
        delivery: Option<String>,
    },
    Verified,
    Rejected {
        reason: RejectReason,
    },
    Malformed {
        detail: String,
    },
    Ignored {
        event: String,
        action: Option<String>,
    },
    Matched {
        event: String,
        action: Option<String>,
    },
    Completed {
        event: String,
    },
    HandlerFailed {
        event: String,
        error: String,
    },
}

/// Sink for dispatch records; doubles as the process-wide error channel for
/// handler failures (`HandlerFailed` is emitted exactly once per failure).
pub trait DispatchObserver: Send + Sync {
    fn record(&self, record: &DispatchRecord);
}

/// Default observer: forwards records to `tracing`
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn record(&self, record: &DispatchRecord) {
        match record {
            DispatchRecord::Received { event, delivery } => {
                info!(
                    event = event.as_deref().unwrap_or("-"),
                    delivery = delivery.as_deref().unwrap_or("-"),
                    "webhook received"
                );
            }
            DispatchRecord::Verified => debug!("signature verified"),
            DispatchRecord::Rejected { reason } => warn!(?reason, "webhook rejected"),
            DispatchRecord::Malformed { detail } => warn!(%detail, "malformed webhook payload"),
            DispatchRecord::Ignored { event, action } => {
                debug!(
                    %event,
                    action = action.as_deref().unwrap_or("-"),
                    "no handler registered, event ignored"
                );
            }
            DispatchRecord::Matched { event, action } => {
                info!(
                    %event,
                    action = action.as_deref().unwrap_or("-"),
                    "handler matched"
                );
            }
            DispatchRecord::Completed { event } => info!(%event, "event handled"),
            DispatchRecord::HandlerFailed { event, error } => {
                error!(%event, %error, "handler failed");
            }
        }
    }
}
