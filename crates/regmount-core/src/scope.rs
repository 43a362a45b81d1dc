//! Per-request state passed explicitly through every registry call.
//!
//! A `RequestScope` lives for exactly one inbound request and is handed by
//! reference to every store and handler that request touches. It carries:
//! - the session identity (user, tenant, caller tenant)
//! - the set of handlers currently executing on behalf of the request
//! - a stack of remote→local path maps pushed by nested local operations
//! - free-form session attributes (e.g. the federated-query dedup list)
//!
//! It uses interior mutability and is deliberately `!Sync`: one request, one
//! thread, end to end.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::ANONYMOUS_USER;
use crate::types::{TenantId, SUPER_TENANT_ID};

/// Remote (actual) path → local (full) path pairs for one nested operation.
pub type PathMap = BTreeMap<String, String>;

/// Build a path map holding a single `actual → full` pair.
pub fn single_path_map(actual: impl Into<String>, full: impl Into<String>) -> PathMap {
    let mut map = PathMap::new();
    map.insert(actual.into(), full.into());
    map
}

// ─── HandlerId ───────────────────────────────────────────────────────────────

/// Process-unique identity of a handler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

impl HandlerId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The id reserved for stateless pass-through handlers.
    pub const fn pass_through() -> Self {
        Self(0)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Identity the request runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    pub tenant_id: TenantId,
    /// Tenant of the original caller; differs from `tenant_id` when a
    /// tenant acts on another tenant's registry.
    pub caller_tenant_id: TenantId,
}

impl Session {
    pub fn new(user: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            user: user.into(),
            tenant_id,
            caller_tenant_id: tenant_id,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER, SUPER_TENANT_ID)
    }
}

// ─── RequestScope ────────────────────────────────────────────────────────────

pub struct RequestScope {
    session: RefCell<Session>,
    in_flight: RefCell<HashSet<HandlerId>>,
    path_maps: RefCell<Vec<PathMap>>,
    attributes: RefCell<HashMap<String, Vec<String>>>,
}

impl RequestScope {
    pub fn new(session: Session) -> Self {
        Self {
            session: RefCell::new(session),
            in_flight: RefCell::new(HashSet::new()),
            path_maps: RefCell::new(Vec::new()),
            attributes: RefCell::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn user(&self) -> String {
        self.session.borrow().user.clone()
    }

    pub fn tenant_id(&self) -> TenantId {
        self.session.borrow().tenant_id
    }

    pub fn caller_tenant_id(&self) -> TenantId {
        self.session.borrow().caller_tenant_id
    }

    /// Run `f` with the session identity replaced; the previous identity is
    /// restored afterwards, including on unwind.
    pub fn as_user<T>(&self, user: &str, tenant_id: TenantId, f: impl FnOnce() -> T) -> T {
        let replacement = Session {
            user: user.to_string(),
            tenant_id,
            caller_tenant_id: tenant_id,
        };
        let previous = self.session.replace(replacement);
        let _restore = RestoreSession {
            scope: self,
            previous: Some(previous),
        };
        f()
    }

    // ── in-flight handlers ──

    pub fn is_in_flight(&self, id: HandlerId) -> bool {
        self.in_flight.borrow().contains(&id)
    }

    /// Mark `id` as executing. Returns `false` if it already was.
    pub fn mark_in_flight(&self, id: HandlerId) -> bool {
        self.in_flight.borrow_mut().insert(id)
    }

    pub fn clear_in_flight(&self, id: HandlerId) {
        self.in_flight.borrow_mut().remove(&id);
    }

    // ── nested path maps ──

    pub fn push_path_map(&self, map: PathMap) {
        self.path_maps.borrow_mut().push(map);
    }

    pub fn pop_path_map(&self) -> Option<PathMap> {
        self.path_maps.borrow_mut().pop()
    }

    /// The innermost path map, if a nested local operation is open.
    pub fn local_path_map(&self) -> Option<PathMap> {
        self.path_maps.borrow().last().cloned()
    }

    /// Number of nested local operations currently open.
    pub fn path_map_depth(&self) -> usize {
        self.path_maps.borrow().len()
    }

    // ── attributes ──

    pub fn attribute(&self, key: &str) -> Option<Vec<String>> {
        self.attributes.borrow().get(key).cloned()
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: Vec<String>) {
        self.attributes.borrow_mut().insert(key.into(), value);
    }

    pub fn remove_attribute(&self, key: &str) -> Option<Vec<String>> {
        self.attributes.borrow_mut().remove(key)
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new(Session::anonymous())
    }
}

impl std::fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScope")
            .field("session", &*self.session.borrow())
            .field("in_flight", &self.in_flight.borrow().len())
            .field("path_map_depth", &self.path_map_depth())
            .finish()
    }
}

struct RestoreSession<'s> {
    scope: &'s RequestScope,
    previous: Option<Session>,
}

impl Drop for RestoreSession<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.scope.session.replace(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_ids_are_unique() {
        let a = HandlerId::next();
        let b = HandlerId::next();
        assert_ne!(a, b);
        assert_ne!(a, HandlerId::pass_through());
    }

    #[test]
    fn in_flight_marking_detects_reentry() {
        let scope = RequestScope::default();
        let id = HandlerId::next();
        assert!(scope.mark_in_flight(id));
        assert!(!scope.mark_in_flight(id));
        assert!(scope.is_in_flight(id));
        scope.clear_in_flight(id);
        assert!(!scope.is_in_flight(id));
    }

    #[test]
    fn path_maps_stack() {
        let scope = RequestScope::default();
        scope.push_path_map(single_path_map("/a", "/m/a"));
        scope.push_path_map(PathMap::new());
        assert_eq!(scope.path_map_depth(), 2);
        assert_eq!(scope.local_path_map(), Some(PathMap::new()));
        scope.pop_path_map();
        assert_eq!(
            scope.local_path_map().and_then(|m| m.get("/a").cloned()),
            Some("/m/a".to_string())
        );
        scope.pop_path_map();
        assert_eq!(scope.path_map_depth(), 0);
    }

    #[test]
    fn as_user_restores_identity() {
        let scope = RequestScope::new(Session::new("alice", 1));
        let seen = scope.as_user("bob", 7, || (scope.user(), scope.tenant_id()));
        assert_eq!(seen, ("bob".to_string(), 7));
        assert_eq!(scope.user(), "alice");
        assert_eq!(scope.tenant_id(), 1);
    }

    #[test]
    fn as_user_restores_identity_on_unwind() {
        let scope = RequestScope::new(Session::new("alice", 1));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            scope.as_user("bob", 7, || panic!("delegate blew up"))
        }));
        assert!(result.is_err());
        assert_eq!(scope.user(), "alice");
    }

    #[test]
    fn attributes_round_trip() {
        let scope = RequestScope::default();
        assert!(scope.attribute("k").is_none());
        scope.set_attribute("k", vec!["v".into()]);
        assert_eq!(scope.attribute("k"), Some(vec!["v".to_string()]));
        assert_eq!(scope.remove_attribute("k"), Some(vec!["v".to_string()]));
    }
}
