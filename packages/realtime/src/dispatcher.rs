//! # Event dispatcher
//!
//! A table from event name to the callbacks registered for it. Components
//! register on mount and remove their handler on unmount; the connection pump
//! calls [`Dispatcher::dispatch`] for every event it reads.
//!
//! Handlers for one name run in registration order, followed by handlers on
//! the [`WILDCARD`] name. The handler list is snapshotted before any handler
//! runs, so a handler may register or remove handlers (its own included);
//! the change applies from the next dispatch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::protocol::ServerEvent;

/// Registering under this name receives every event.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Rc<dyn Fn(&ServerEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<String, Vec<(HandlerId, Handler)>>,
}

/// Cheap to clone; clones share one table.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Rc<RefCell<Registry>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&ServerEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = HandlerId(registry.next_id);
        registry
            .handlers
            .entry(event.into())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Remove one handler. Returns `false` if it was already gone.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let mut removed = false;
        registry.handlers.retain(|_, list| {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(event)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }

    /// Run every handler registered for the event's name, then the wildcard
    /// handlers. Returns how many ran.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        let snapshot: Vec<Handler> = {
            let registry = self.registry.borrow();
            let named = registry.handlers.get(event.name()).into_iter().flatten();
            let wildcard = registry.handlers.get(WILDCARD).into_iter().flatten();
            named
                .chain(wildcard)
                .map(|(_, handler)| Rc::clone(handler))
                .collect()
        };
        if snapshot.is_empty() {
            tracing::debug!("no handler for '{}'", event.name());
        }
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut names: Vec<(&String, usize)> = registry
            .handlers
            .iter()
            .map(|(name, list)| (name, list.len()))
            .collect();
        names.sort();
        f.debug_struct("Dispatcher").field("handlers", &names).finish()
    }
}
