//! Per-request reentrancy tracking for one handler instance.

use regmount_core::{HandlerId, RequestScope};

/// Detects a handler being re-entered while one of its own calls is running
/// on the same request (a delegate that loops back into the chain).
#[derive(Debug, Clone, Copy)]
pub struct ReentrancyGuard {
    id: HandlerId,
}

impl ReentrancyGuard {
    pub fn new(id: HandlerId) -> Self {
        Self { id }
    }

    pub fn is_active(&self, scope: &RequestScope) -> bool {
        scope.is_in_flight(self.id)
    }

    /// Mark the handler as running. Returns `None` on re-entry, in which
    /// case the caller must fall back to pass-through behaviour.
    pub fn enter<'s>(&self, scope: &'s RequestScope) -> Option<ActiveCall<'s>> {
        if scope.mark_in_flight(self.id) {
            Some(ActiveCall { scope, id: self.id })
        } else {
            None
        }
    }
}

/// The outermost call of a handler; clears the in-flight mark on drop.
#[must_use = "the handler is marked idle as soon as the call guard is dropped"]
pub struct ActiveCall<'s> {
    scope: &'s RequestScope,
    id: HandlerId,
}

impl ActiveCall<'_> {
    /// Run `f` with the in-flight mark lifted, so a nested call through the
    /// chain reaches this handler's full logic once. The mark is restored
    /// afterwards, including on unwind.
    pub fn suspended<T>(&self, f: impl FnOnce() -> T) -> T {
        self.scope.clear_in_flight(self.id);
        let _resume = Resume {
            scope: self.scope,
            id: self.id,
        };
        f()
    }
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.scope.clear_in_flight(self.id);
    }
}

struct Resume<'s> {
    scope: &'s RequestScope,
    id: HandlerId,
}

impl Drop for Resume<'_> {
    fn drop(&mut self) {
        self.scope.mark_in_flight(self.id);
    }
}
