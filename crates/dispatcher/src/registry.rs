//! Handler registration

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::EventHandler;

/// Routing key for a handler: event type, optionally qualified by action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    pub event: String,
    pub action: Option<String>,
}

/// Mapping from routing keys to handlers.
///
/// Built once at startup and read-only afterwards. Registering the same key
/// twice replaces the earlier handler, so the last registration wins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<RoutingKey, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        event: impl Into<String>,
        action: Option<&str>,
        handler: Arc<dyn EventHandler>,
    ) {
        let key = RoutingKey {
            event: event.into(),
            action: action.map(str::to_string),
        };
        self.handlers.insert(key, handler);
    }

    /// Find the handler for `(event, action)`.
    ///
    /// Tries the exact pair first, then falls back to the action-less
    /// registration for the event type.
    pub fn lookup(&self, event: &str, action: Option<&str>) -> Option<Arc<dyn EventHandler>> {
        let exact = RoutingKey {
            event: event.to_string(),
            action: action.map(str::to_string),
        };
        if let Some(handler) = self.handlers.get(&exact) {
            return Some(Arc::clone(handler));
        }
        if action.is_some() {
            let fallback = RoutingKey {
                event: event.to_string(),
                action: None,
            };
            if let Some(handler) = self.handlers.get(&fallback) {
                return Some(Arc::clone(handler));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}
