//! Event dispatcher - invokes registered handlers in weight order.
//!
//! Handlers are indexed by [`EventKind`]. A handler that fails is logged and
//! skipped, so the remaining handlers still see the event. Handlers run
//! without the handler table locked and may register further handlers,
//! which take effect from the next event.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tracing::{debug, error};

use super::types::{EventBus, EventKind, ModuleEvent};

type Handler = Arc<dyn Fn(&ModuleEvent) -> Result<()> + Send + Sync>;

/// A registered handler with its name and priority.
#[derive(Clone)]
struct RegisteredHandler {
    name: String,
    /// Weight for ordering (lower = called first).
    weight: i32,
    handler: Handler,
}

/// Dispatcher mapping event kinds to ordered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<RegisteredHandler>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    ///
    /// Handlers with equal weight run in the order they were added.
    pub fn listen<F>(&self, kind: EventKind, name: impl Into<String>, weight: i32, handler: F)
    where
        F: Fn(&ModuleEvent) -> Result<()> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write();
        let list = handlers.entry(kind).or_default();
        list.push(RegisteredHandler {
            name: name.into(),
            weight,
            handler: Arc::new(handler),
        });
        list.sort_by_key(|h| h.weight);
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.handler_count(kind) > 0
    }

    /// Handler names for `kind`, in call order.
    pub fn handler_names(&self, kind: EventKind) -> Vec<String> {
        self.handlers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|h| h.name.clone()).collect())
            .unwrap_or_default()
    }
}

impl EventBus for EventDispatcher {
    fn emit(&self, event: &ModuleEvent) {
        let kind = event.kind();
        let list = self.handlers.read().get(&kind).cloned().unwrap_or_default();
        if list.is_empty() {
            debug!(event = %kind, "no handlers registered for event");
            return;
        }

        let mut failed = 0usize;
        for h in &list {
            if let Err(e) = (h.handler)(event) {
                failed += 1;
                error!(
                    handler = %h.name,
                    event = %kind,
                    module = %event.module().name,
                    error = %e,
                    "event handler failed"
                );
            }
        }

        debug!(
            event = %kind,
            handlers = list.len(),
            failed,
            "dispatch complete"
        );
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<EventKind, usize> =
            handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .finish()
    }
}
