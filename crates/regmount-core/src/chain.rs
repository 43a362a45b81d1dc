//! The handler chain: phased registration and dispatch.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::RegistryError;
use crate::handler::{Filter, Handler, Operation};
use crate::scope::HandlerId;

/// Lifecycle phase a handler is registered in. Dispatch visits phases in
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerPhase {
    /// Built-in handlers installed with the registry.
    System,
    /// Handlers installed per tenant, including mounts.
    Tenant,
    /// Handlers added at runtime by users.
    User,
}

/// The part of the chain a handler may call back into.
pub trait HandlerChain: Send + Sync {
    /// Register `handler` in `phase`, gated by `filter`.
    fn add_handler(
        &self,
        phase: HandlerPhase,
        filter: Arc<dyn Filter>,
        handler: Arc<dyn Handler>,
    );

    /// Detach `id` from `phase`. Returns `true` if an entry was removed.
    fn remove_handler(&self, id: HandlerId, phase: HandlerPhase) -> bool;
}

struct HandlerEntry {
    phase: HandlerPhase,
    filter: Arc<dyn Filter>,
    handler: Arc<dyn Handler>,
}

/// Ordered registry of `(phase, filter, handler)` entries.
///
/// Entries are snapshotted before every dispatch, so a handler may add or
/// remove entries (including itself) while it runs.
pub struct HandlerManager {
    entries: RwLock<Vec<HandlerEntry>>,
}

impl HandlerManager {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn add_handler(
        &self,
        phase: HandlerPhase,
        filter: Arc<dyn Filter>,
        handler: Arc<dyn Handler>,
    ) {
        debug!(handler = %handler.id(), name = handler.name(), ?phase, "handler added");
        self.entries.write().unwrap().push(HandlerEntry {
            phase,
            filter,
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.entries
            .read()
            .unwrap()
            .iter()
            .any(|e| e.handler.id() == id)
    }

    /// Handlers whose filter accepts `op`, in phase order.
    fn matching(&self, op: Operation, ctx: &RequestContext<'_>) -> Vec<Arc<dyn Handler>> {
        let mut snapshot: Vec<(HandlerPhase, Arc<dyn Filter>, Arc<dyn Handler>)> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .map(|e| (e.phase, Arc::clone(&e.filter), Arc::clone(&e.handler)))
            .collect();
        snapshot.sort_by_key(|(phase, _, _)| *phase);
        snapshot
            .into_iter()
            .filter(|(_, filter, _)| filter.matches(op, ctx))
            .map(|(_, _, handler)| handler)
            .collect()
    }

    /// Run matching handlers until one marks processing complete.
    ///
    /// Returns the completing handler's result, or `None` if no handler
    /// completed and the caller should fall back to the repository.
    pub fn dispatch<'a, T, F>(
        &self,
        op: Operation,
        ctx: &mut RequestContext<'a>,
        call: F,
    ) -> Result<Option<T>, RegistryError>
    where
        F: Fn(&dyn Handler, &mut RequestContext<'a>) -> Result<T, RegistryError>,
    {
        for handler in self.matching(op, ctx) {
            let value = call(handler.as_ref(), ctx)?;
            if ctx.processing_complete() {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Run every matching handler and gather what each returned.
    ///
    /// Used for federated operations (queries, tag searches) where each mount
    /// contributes a partial result. Stops early only if a handler marks
    /// processing complete.
    pub fn collect<'a, T, F>(
        &self,
        op: Operation,
        ctx: &mut RequestContext<'a>,
        call: F,
    ) -> Result<Vec<T>, RegistryError>
    where
        F: Fn(&dyn Handler, &mut RequestContext<'a>) -> Result<Option<T>, RegistryError>,
    {
        let mut results = Vec::new();
        for handler in self.matching(op, ctx) {
            if let Some(value) = call(handler.as_ref(), ctx)? {
                results.push(value);
            }
            if ctx.processing_complete() {
                break;
            }
        }
        Ok(results)
    }
}

impl Default for HandlerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerChain for HandlerManager {
    fn add_handler(
        &self,
        phase: HandlerPhase,
        filter: Arc<dyn Filter>,
        handler: Arc<dyn Handler>,
    ) {
        HandlerManager::add_handler(self, phase, filter, handler);
    }

    fn remove_handler(&self, id: HandlerId, phase: HandlerPhase) -> bool {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.phase == phase && e.handler.id() == id));
        let removed = entries.len() != before;
        if removed {
            info!(handler = %id, ?phase, "handler removed from chain");
        }
        removed
    }
}
