//! Embedded-registry collaborators backed by [`MemoryStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use regmount_core::{
    EmbeddedRegistryFactory, EmbeddedRegistryService, EmbeddedSettings, PathMap, RegistryError,
    RegistryStore, TenantId, TransactionScope, UserScopedStore,
};
use tracing::{debug, warn};

use crate::memory::MemoryStore;

const DEFAULT_DB_CONFIG: &str = "default";

// ─── NestedTransactions ──────────────────────────────────────────────────────

/// Counting [`TransactionScope`].
///
/// The in-memory store commits every call immediately, so a nested unit of
/// work only needs to be tracked, not rolled back. The counters let callers
/// verify that pushes and pops stay balanced.
#[derive(Debug, Default)]
pub struct NestedTransactions {
    depth: AtomicUsize,
    pushed: AtomicUsize,
    popped: AtomicUsize,
    last_map: Mutex<Option<PathMap>>,
}

impl NestedTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nested units currently open.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn pushed(&self) -> usize {
        self.pushed.load(Ordering::SeqCst)
    }

    pub fn popped(&self) -> usize {
        self.popped.load(Ordering::SeqCst)
    }

    /// Path map of the most recent push.
    pub fn last_path_map(&self) -> Option<PathMap> {
        self.last_map.lock().unwrap().clone()
    }
}

impl TransactionScope for NestedTransactions {
    fn push_nested(&self, map: &PathMap) {
        self.pushed.fetch_add(1, Ordering::SeqCst);
        self.depth.fetch_add(1, Ordering::SeqCst);
        *self.last_map.lock().unwrap() = Some(map.clone());
    }

    fn pop_nested(&self) {
        let popped = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
        if popped.is_err() {
            warn!("nested transaction popped with none open");
            return;
        }
        self.popped.fetch_add(1, Ordering::SeqCst);
    }
}

// ─── MemoryEmbeddedService ───────────────────────────────────────────────────

/// An embedded registry over one [`MemoryStore`].
pub struct MemoryEmbeddedService {
    store: MemoryStore,
    transactions: Arc<NestedTransactions>,
}

impl MemoryEmbeddedService {
    pub fn new(store: MemoryStore, transactions: Arc<NestedTransactions>) -> Self {
        Self {
            store,
            transactions,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl EmbeddedRegistryService for MemoryEmbeddedService {
    fn user_registry(
        &self,
        user: &str,
        tenant_id: TenantId,
    ) -> Result<Arc<dyn RegistryStore>, RegistryError> {
        Ok(Arc::new(UserScopedStore::new(
            Arc::new(self.store.clone()),
            user,
            tenant_id,
        )))
    }

    fn transactions(&self) -> Arc<dyn TransactionScope> {
        self.transactions.clone()
    }
}

// ─── MemoryEmbeddedFactory ───────────────────────────────────────────────────

/// Opens embedded registries keyed by database configuration name.
///
/// Each `db_config` maps to one [`MemoryStore`] (created on first use unless
/// registered up front with [`with_store`](Self::with_store)). Read-only
/// settings yield a read-only view over the same data. All services share
/// one [`NestedTransactions`].
pub struct MemoryEmbeddedFactory {
    stores: RwLock<HashMap<String, MemoryStore>>,
    transactions: Arc<NestedTransactions>,
    opened: AtomicUsize,
}

impl MemoryEmbeddedFactory {
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            transactions: Arc::new(NestedTransactions::new()),
            opened: AtomicUsize::new(0),
        }
    }

    /// Register the store served for `db_config`.
    pub fn with_store(self, db_config: impl Into<String>, store: MemoryStore) -> Self {
        self.stores.write().unwrap().insert(db_config.into(), store);
        self
    }

    pub fn transactions(&self) -> &Arc<NestedTransactions> {
        &self.transactions
    }

    /// How many times [`open`](EmbeddedRegistryFactory::open) was called.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for MemoryEmbeddedFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedRegistryFactory for MemoryEmbeddedFactory {
    fn open(
        &self,
        settings: &EmbeddedSettings,
    ) -> Result<Arc<dyn EmbeddedRegistryService>, RegistryError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let key = settings
            .db_config
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_CONFIG.to_string());
        let store = self
            .stores
            .write()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .clone();
        let store = if settings.read_only {
            store.read_only_view()
        } else {
            store
        };
        debug!(
            db_config = %key,
            read_only = settings.read_only,
            root = settings.registry_root.as_deref().unwrap_or("/"),
            "embedded registry opened"
        );
        Ok(Arc::new(MemoryEmbeddedService::new(
            store,
            Arc::clone(&self.transactions),
        )))
    }
}
