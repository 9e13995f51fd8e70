//! Application state

use dispatcher::Dispatcher;

/// Shared application state
///
/// Everything here is read-only after startup; the router clones the `Arc`
/// per request.
pub struct AppState {
    pub dispatcher: Dispatcher,
}
