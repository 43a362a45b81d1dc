//! End-to-end behaviour of `MountHandler` inside a handled registry.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use regmount_core::constants::{
    REGISTRY_LINK, REGISTRY_LINK_RESTORATION, REGISTRY_MOUNT, REGISTRY_REAL_PATH, REGISTRY_USER,
    REMOTE_MOUNT_OPERATION, XSD_MEDIA_TYPE,
};
use regmount_core::{
    Comment, HandledRegistry, Handler, HandlerManager, MountEntry, MountRegistry, QueryParams,
    RegistryError, RegistryStore, RemoteConnector, RemoteTarget, RequestContext, RequestScope,
    Resource, Session,
};
use regmount_mount::{
    EndpointServices, MountConfig, MountConfigBuilder, MountHandler, StoreMountRegistry,
};
use regmount_store::{MemoryEmbeddedFactory, MemoryStore};

const URL: &str = "https://registry.example.com/registry";

// ─── fixtures ────────────────────────────────────────────────────────────────

struct Harness {
    manager: Arc<HandlerManager>,
    registry: Arc<HandledRegistry>,
    local: MemoryStore,
    handler: Arc<MountHandler>,
}

fn harness(config: MountConfig, services: EndpointServices) -> Harness {
    let manager = Arc::new(HandlerManager::new());
    let local = MemoryStore::new();
    let registry = Arc::new(HandledRegistry::new(Arc::new(local.clone()), manager.clone()));
    let handler = MountHandler::new(config, services).install(&manager);
    Harness {
        manager,
        registry,
        local,
        handler,
    }
}

fn alice() -> RequestScope {
    RequestScope::new(Session::new("alice", 1))
}

fn remote_config() -> MountConfigBuilder {
    MountConfig::builder()
        .id("instance-a")
        .mount_point("/remote")
        .sub_path("/local/data")
        .remote(true)
        .connection_url(URL)
}

/// A mounted store holding `/local/data/a` and `/local/data/b`.
fn seeded_remote() -> MemoryStore {
    let store = MemoryStore::new();
    let scope = RequestScope::new(Session::new("remote-admin", 1));
    store
        .put(&scope, "/local/data/a", Resource::new("").with_bytes("alpha"))
        .unwrap();
    store
        .put(&scope, "/local/data/b", Resource::new("").with_bytes("beta"))
        .unwrap();
    store
}

struct StaticConnector {
    store: Arc<dyn RegistryStore>,
    connects: AtomicUsize,
}

impl StaticConnector {
    fn new(store: Arc<dyn RegistryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            connects: AtomicUsize::new(0),
        })
    }
}

impl RemoteConnector for StaticConnector {
    fn connect(&self, _target: &RemoteTarget) -> Result<Arc<dyn RegistryStore>, RegistryError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.store))
    }
}

fn remote_harness(remote: Arc<dyn RegistryStore>) -> Harness {
    let connector = StaticConnector::new(remote);
    harness(
        remote_config().build().unwrap(),
        EndpointServices::new().with_remote_connector(connector),
    )
}

/// Records which operations reached the mounted store.
struct Probe {
    store: MemoryStore,
    calls: Mutex<Vec<&'static str>>,
}

impl Probe {
    fn new(store: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }

    fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }
}

impl RegistryStore for Probe {
    fn get(&self, scope: &RequestScope, path: &str) -> Result<Resource, RegistryError> {
        self.record("get");
        self.store.get(scope, path)
    }

    fn put(
        &self,
        scope: &RequestScope,
        path: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        self.record("put");
        self.store.put(scope, path, resource)
    }

    fn delete(&self, scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        self.record("delete");
        self.store.delete(scope, path)
    }

    fn resource_exists(&self, scope: &RequestScope, path: &str) -> Result<bool, RegistryError> {
        self.record("resource_exists");
        self.store.resource_exists(scope, path)
    }

    fn rename(
        &self,
        scope: &RequestScope,
        path: &str,
        new_path: &str,
    ) -> Result<String, RegistryError> {
        self.record("rename");
        self.store.rename(scope, path, new_path)
    }

    fn move_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        self.record("move");
        self.store.move_resource(scope, path, target)
    }

    fn copy(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        self.record("copy");
        self.store.copy(scope, path, target)
    }

    fn execute_query(
        &self,
        scope: &RequestScope,
        path: Option<&str>,
        params: &QueryParams,
    ) -> Result<Resource, RegistryError> {
        self.record("execute_query");
        self.store.execute_query(scope, path, params)
    }

    fn dump(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.record("dump");
        self.store.dump(scope, path, out)
    }

    fn dump_lite(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.record("dump_lite");
        self.store.dump_lite(scope, path, out)
    }

    fn restore(
        &self,
        scope: &RequestScope,
        path: &str,
        input: &mut dyn Read,
    ) -> Result<(), RegistryError> {
        self.record("restore");
        self.store.restore(scope, path, input)
    }
}

/// Every call fails; secondary operations fall back to the trait defaults,
/// which fail as unsupported.
struct Unreachable;

impl RegistryStore for Unreachable {
    fn get(&self, _scope: &RequestScope, _path: &str) -> Result<Resource, RegistryError> {
        Err(RegistryError::Other("connection refused".into()))
    }

    fn put(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _r: Resource,
    ) -> Result<String, RegistryError> {
        Err(RegistryError::Other("connection refused".into()))
    }

    fn delete(&self, _scope: &RequestScope, _path: &str) -> Result<(), RegistryError> {
        Err(RegistryError::Other("connection refused".into()))
    }

    fn resource_exists(&self, _scope: &RequestScope, _path: &str) -> Result<bool, RegistryError> {
        Err(RegistryError::Other("connection refused".into()))
    }
}

struct CountingMountRegistry {
    inner: StoreMountRegistry,
    calls: AtomicUsize,
}

impl MountRegistry for CountingMountRegistry {
    fn add_mount_entry(
        &self,
        system: &dyn RegistryStore,
        scope: &RequestScope,
        entry: &MountEntry,
    ) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.add_mount_entry(system, scope, entry)
    }
}

/// Fails the first `failures` registrations, then delegates.
struct FlakyMountRegistry {
    inner: StoreMountRegistry,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl MountRegistry for FlakyMountRegistry {
    fn add_mount_entry(
        &self,
        system: &dyn RegistryStore,
        scope: &RequestScope,
        entry: &MountEntry,
    ) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RegistryError::Other("mount collection unavailable".into()));
        }
        self.inner.add_mount_entry(system, scope, entry)
    }
}

// ─── path translation through the chain ──────────────────────────────────────

#[test]
fn collection_children_are_translated_back_to_the_mount() {
    let h = remote_harness(Arc::new(seeded_remote()));
    let scope = alice();

    let collection = h.registry.get(&scope, "/remote").unwrap();
    assert_eq!(collection.path, "/remote");
    assert_eq!(collection.children(), ["/remote/a", "/remote/b"]);
    assert_eq!(scope.path_map_depth(), 0);
}

#[test]
fn fetched_resources_carry_provenance() {
    let config = remote_config()
        .user_name("remote-admin")
        .author("archivist")
        .build()
        .unwrap();
    let connector = StaticConnector::new(Arc::new(seeded_remote()));
    let h = harness(config, EndpointServices::new().with_remote_connector(connector));
    let scope = alice();

    let a = h.registry.get(&scope, "/remote/a").unwrap();
    assert_eq!(a.path, "/remote/a");
    assert_eq!(a.bytes(), b"alpha");
    assert_eq!(a.author.as_deref(), Some("archivist"));
    assert_eq!(a.user_name.as_deref(), Some("alice"));
    assert_eq!(a.property(REGISTRY_LINK), Some("true"));
    assert_eq!(a.property(REGISTRY_MOUNT), Some("true"));
    assert_eq!(a.property(REGISTRY_USER), Some("remote-admin"));
    assert_eq!(
        a.property(REGISTRY_REAL_PATH),
        Some("https://registry.example.com/registry/resourceContent?path=/local/data/a")
    );
}

#[test]
fn missing_resource_reports_the_requested_path() {
    let h = remote_harness(Arc::new(seeded_remote()));
    let err = h.registry.get(&alice(), "/remote/foo.xml").unwrap_err();
    match err {
        RegistryError::NotFound { path, .. } => assert_eq!(path, "/remote/foo.xml"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn unreachable_mount_surfaces_as_not_found_with_cause() {
    let h = remote_harness(Arc::new(Unreachable));
    let err = h.registry.get(&alice(), "/remote/a").unwrap_err();
    assert!(err.is_not_found());
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn paths_outside_the_mount_are_served_locally() {
    let h = remote_harness(Arc::new(seeded_remote()));
    let scope = alice();
    h.registry
        .put(&scope, "/remoteX/a", Resource::new("").with_bytes("local"))
        .unwrap();
    assert_eq!(h.local.get(&scope, "/remoteX/a").unwrap().bytes(), b"local");
    assert_eq!(h.registry.get(&scope, "/remoteX/a").unwrap().property(REGISTRY_MOUNT), None);
}

// ─── writes ──────────────────────────────────────────────────────────────────

#[test]
fn put_strips_provenance_and_marks_remote_schemas() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();

    let schema = Resource::new("")
        .with_media_type(XSD_MEDIA_TYPE)
        .with_property(REGISTRY_MOUNT, "true")
        .with_property(REGISTRY_REAL_PATH, "/elsewhere")
        .with_property("owner", "team-a");
    h.registry.put(&scope, "/remote/s.xsd", schema).unwrap();

    let stored = remote.get(&scope, "/local/data/s.xsd").unwrap();
    assert_eq!(stored.property(REGISTRY_MOUNT), None);
    assert_eq!(stored.property(REGISTRY_REAL_PATH), None);
    assert_eq!(stored.property("owner"), Some("team-a"));
    assert_eq!(stored.property(REMOTE_MOUNT_OPERATION), Some("true"));
    assert!(!h.local.resource_exists(&scope, "/remote/s.xsd").unwrap());
}

#[test]
fn failed_put_is_wrapped() {
    let h = remote_harness(Arc::new(Unreachable));
    let err = h
        .registry
        .put(&alice(), "/remote/x", Resource::new(""))
        .unwrap_err();
    assert!(matches!(err, RegistryError::Delegate { .. }));
    assert!(err.to_string().starts_with("Unable to put resource"));
}

#[test]
fn delete_below_the_mount_is_delegated() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();
    h.registry.delete(&scope, "/remote/a").unwrap();
    assert!(!remote.resource_exists(&scope, "/local/data/a").unwrap());
}

#[test]
fn deleting_the_mount_point_unmounts() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();
    h.registry.create_link(&scope, "/remote", "instance-a").unwrap();

    h.registry.delete(&scope, "/remote").unwrap();

    assert!(!h.manager.contains(h.handler.id()));
    assert!(!h.local.resource_exists(&scope, "/remote").unwrap());
    assert!(remote.resource_exists(&scope, "/local/data/a").unwrap());
}

// ─── relocation ──────────────────────────────────────────────────────────────

#[test]
fn moving_the_mount_point_relinks_without_touching_the_mount() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();
    h.registry.create_link(&scope, "/remote", "instance-a").unwrap();

    let moved = h.registry.move_resource(&scope, "/remote", "/moved").unwrap();

    assert_eq!(moved, "/moved");
    assert!(!h.manager.contains(h.handler.id()));
    assert_eq!(h.manager.len(), 1);
    let links = h.local.links();
    assert_eq!(links.get("/moved").map(String::as_str), Some("instance-a"));
    assert!(!links.contains_key("/remote"));
    for op in ["move", "copy", "dump", "restore", "delete"] {
        assert_eq!(probe.count(op), 0, "{op} reached the mounted store");
    }

    let a = h.registry.get(&scope, "/moved/a").unwrap();
    assert_eq!(a.path, "/moved/a");
    assert_eq!(a.bytes(), b"alpha");
    assert!(h.registry.get(&scope, "/remote/a").unwrap_err().is_not_found());
}

#[test]
fn copying_the_mount_point_serves_the_mount_from_both_paths() {
    let h = remote_harness(Arc::new(seeded_remote()));
    let scope = alice();
    h.registry.create_link(&scope, "/remote", "instance-a").unwrap();

    let copied = h.registry.copy(&scope, "/remote", "/mirror").unwrap();

    assert_eq!(copied, "/mirror");
    assert!(h.manager.contains(h.handler.id()));
    assert_eq!(h.manager.len(), 2);
    assert_eq!(h.registry.get(&scope, "/remote/b").unwrap().bytes(), b"beta");
    assert_eq!(h.registry.get(&scope, "/mirror/b").unwrap().bytes(), b"beta");
}

#[test]
fn renaming_inside_the_mount_is_delegated() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();

    let renamed = h.registry.rename(&scope, "/remote/a", "c").unwrap();

    assert_eq!(renamed, "/remote/c");
    assert_eq!(probe.count("rename"), 1);
    assert!(probe.store.resource_exists(&scope, "/local/data/c").unwrap());
}

#[test]
fn move_inside_the_mount_is_delegated() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();

    let moved = h.registry.move_resource(&scope, "/remote/a", "/remote/nested/a").unwrap();

    assert_eq!(moved, "/remote/nested/a");
    assert_eq!(probe.count("move"), 1);
    assert_eq!(probe.count("dump"), 0);
    assert!(probe.store.resource_exists(&scope, "/local/data/nested/a").unwrap());
}

#[test]
fn move_into_the_mount_falls_back_to_dump_and_restore() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();
    h.local
        .put(&scope, "/docs/report.xml", Resource::new("").with_bytes("q3"))
        .unwrap();

    let moved = h
        .registry
        .move_resource(&scope, "/docs/report.xml", "/remote/report.xml")
        .unwrap();

    assert_eq!(moved, "/remote/report.xml");
    assert_eq!(probe.count("restore"), 1);
    assert_eq!(
        probe.store.get(&scope, "/local/data/report.xml").unwrap().bytes(),
        b"q3"
    );
    assert!(!h.local.resource_exists(&scope, "/docs/report.xml").unwrap());
}

#[test]
fn copy_out_of_the_mount_keeps_the_source() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();

    let copied = h.registry.copy(&scope, "/remote/b", "/docs/b").unwrap();

    assert_eq!(copied, "/docs/b");
    assert_eq!(probe.count("dump"), 1);
    assert_eq!(probe.count("delete"), 0);
    assert_eq!(h.local.get(&scope, "/docs/b").unwrap().bytes(), b"beta");
    assert!(probe.store.resource_exists(&scope, "/local/data/b").unwrap());
}

#[test]
fn move_out_of_the_mount_deletes_the_mounted_source() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();

    h.registry.move_resource(&scope, "/remote/a", "/docs/a").unwrap();

    assert_eq!(h.local.get(&scope, "/docs/a").unwrap().bytes(), b"alpha");
    assert!(!probe.store.resource_exists(&scope, "/local/data/a").unwrap());
}

// ─── reentrancy, scopes and endpoint resolution ──────────────────────────────

struct Loopback(Weak<HandledRegistry>);

impl RemoteConnector for Loopback {
    fn connect(&self, _target: &RemoteTarget) -> Result<Arc<dyn RegistryStore>, RegistryError> {
        let registry = self
            .0
            .upgrade()
            .ok_or_else(|| RegistryError::configuration("registry dropped"))?;
        Ok(registry as Arc<dyn RegistryStore>)
    }
}

#[test]
fn mount_that_loops_back_into_its_own_chain_terminates() {
    let manager = Arc::new(HandlerManager::new());
    let local = MemoryStore::new();
    let registry = Arc::new(HandledRegistry::new(Arc::new(local.clone()), manager.clone()));
    let config = MountConfig::builder()
        .id("self")
        .mount_point("/loop")
        .sub_path("/loop")
        .remote(true)
        .connection_url("https://loop.example.com/registry")
        .build()
        .unwrap();
    let loopback = Loopback(Arc::downgrade(&registry));
    let services = EndpointServices::new().with_remote_connector(Arc::new(loopback));
    MountHandler::new(config, services).install(&manager);

    let scope = alice();
    local
        .put(&scope, "/loop/x", Resource::new("").with_bytes("looped"))
        .unwrap();

    let x = registry.get(&scope, "/loop/x").unwrap();
    assert_eq!(x.bytes(), b"looped");
    assert_eq!(x.property(REGISTRY_MOUNT), Some("true"));

    let root = registry.get(&scope, "/loop").unwrap();
    assert_eq!(root.children(), ["/loop/x"]);
}

#[test]
fn nested_scopes_stay_balanced_when_the_delegate_fails() {
    let factory = Arc::new(MemoryEmbeddedFactory::new().with_store("archive", seeded_remote()));
    let config = MountConfig::builder()
        .id("archive")
        .mount_point("/archive")
        .sub_path("/local/data")
        .db_config("archive")
        .read_only(true)
        .build()
        .unwrap();
    let h = harness(
        config,
        EndpointServices::new().with_embedded_factory(factory.clone()),
    );
    let scope = alice();
    let tx = factory.transactions();

    let a = h.registry.get(&scope, "/archive/a").unwrap();
    assert_eq!(a.property(REGISTRY_REAL_PATH), Some("/local/data/a"));
    assert!(tx.pushed() > 0);
    assert_eq!(
        tx.last_path_map().and_then(|m| m.get("/local/data/a").cloned()),
        Some("/archive/a".to_string())
    );

    assert!(h.registry.put(&scope, "/archive/new", Resource::new("")).is_err());
    assert!(h.registry.get(&scope, "/archive/missing").is_err());

    assert_eq!(tx.pushed(), tx.popped());
    assert_eq!(tx.depth(), 0);
    assert_eq!(scope.path_map_depth(), 0);
}

#[test]
fn endpoint_resolves_once_and_registers_once() {
    let factory = Arc::new(MemoryEmbeddedFactory::new().with_store("archive", seeded_remote()));
    let mount_registry = Arc::new(CountingMountRegistry {
        inner: StoreMountRegistry::new(),
        calls: AtomicUsize::new(0),
    });
    let config = MountConfig::builder()
        .id("archive")
        .mount_point("/archive")
        .sub_path("/local/data")
        .db_config("archive")
        .build()
        .unwrap();
    let h = harness(
        config,
        EndpointServices::new()
            .with_embedded_factory(factory.clone())
            .with_mount_registry(mount_registry.clone()),
    );
    let scope = alice();

    for _ in 0..3 {
        h.registry.get(&scope, "/archive/a").unwrap();
        h.registry.resource_exists(&scope, "/archive/b").unwrap();
    }

    let first = h.handler.endpoint().backend().unwrap();
    let second = h.handler.endpoint().backend().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.opened(), 1);
    assert_eq!(mount_registry.calls.load(Ordering::SeqCst), 1);
    assert!(h.handler.endpoint().is_registered());

    let entry = h
        .local
        .get(&scope, "/_system/local/repository/mounts/-archive")
        .unwrap();
    assert_eq!(entry.property("target"), Some("archive"));
    assert_eq!(entry.property("subPath"), Some("/local/data"));
}

#[test]
fn failed_registration_is_not_fatal_and_retried() {
    let mount_registry = Arc::new(FlakyMountRegistry {
        inner: StoreMountRegistry::new(),
        failures: AtomicUsize::new(1),
        calls: AtomicUsize::new(0),
    });
    let connector = StaticConnector::new(Arc::new(seeded_remote()));
    let h = harness(
        remote_config().build().unwrap(),
        EndpointServices::new()
            .with_remote_connector(connector)
            .with_mount_registry(mount_registry.clone()),
    );
    let scope = alice();

    let a = h.registry.get(&scope, "/remote/a").unwrap();
    assert_eq!(a.bytes(), b"alpha");
    assert_eq!(mount_registry.calls.load(Ordering::SeqCst), 1);
    assert!(!h.handler.endpoint().is_registered());

    h.registry.get(&scope, "/remote/b").unwrap();
    assert_eq!(mount_registry.calls.load(Ordering::SeqCst), 2);
    assert!(h.handler.endpoint().is_registered());
    assert!(h
        .local
        .resource_exists(&scope, "/_system/local/repository/mounts/-remote")
        .unwrap());

    h.registry.get(&scope, "/remote/a").unwrap();
    assert_eq!(mount_registry.calls.load(Ordering::SeqCst), 2);
}

// ─── federated operations ────────────────────────────────────────────────────

#[test]
fn federated_query_asks_each_mount_once_per_request() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();
    h.local
        .put(&scope, "/docs/alpha-notes", Resource::new(""))
        .unwrap();
    let mut params = QueryParams::new();
    params.insert("name".into(), "a".into());

    let first = h.registry.execute_query(&scope, None, &params).unwrap();
    assert!(first.children().contains(&"/remote/a".to_string()));
    assert!(first.children().contains(&"/docs/alpha-notes".to_string()));

    let second = h.registry.execute_query(&scope, None, &params).unwrap();
    assert_eq!(probe.count("execute_query"), 1);
    assert!(!second.children().contains(&"/remote/a".to_string()));

    h.registry.execute_query(&alice(), None, &params).unwrap();
    assert_eq!(probe.count("execute_query"), 2);
}

#[test]
fn tag_search_merges_mounted_and_local_matches() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();
    h.local.put(&scope, "/docs/x", Resource::new("")).unwrap();
    h.registry.apply_tag(&scope, "/docs/x", "hot").unwrap();
    h.registry.apply_tag(&scope, "/remote/a", "hot").unwrap();

    let tagged: Vec<String> = h
        .registry
        .get_resource_paths_with_tag(&scope, "hot")
        .unwrap()
        .into_iter()
        .map(|t| t.resource_path)
        .collect();
    assert_eq!(tagged, vec!["/remote/a", "/docs/x"]);
    assert_eq!(h.registry.get_tags(&scope, "/remote/a").unwrap()[0].name, "hot");

    h.registry.remove_tag(&scope, "/remote/a", "hot").unwrap();
    assert!(remote.get_tags(&scope, "/local/data/a").unwrap().is_empty());
}

// ─── metadata ────────────────────────────────────────────────────────────────

#[test]
fn comment_paths_are_translated_both_ways() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();

    let path = h
        .registry
        .add_comment(&scope, "/remote/a", Comment::new("looks good", "alice"))
        .unwrap();
    assert_eq!(path, "/remote/a;comments:1");

    let comments = h.registry.get_comments(&scope, "/remote/a").unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].path.as_deref(), Some("/remote/a;comments:1"));

    h.registry.remove_comment(&scope, &path).unwrap();
    assert!(remote.get_comments(&scope, "/local/data/a").unwrap().is_empty());
}

#[test]
fn remote_ratings_act_as_the_configured_user() {
    let remote = seeded_remote();
    let config = remote_config().user_name("remote-admin").build().unwrap();
    let connector = StaticConnector::new(Arc::new(remote.clone()));
    let h = harness(config, EndpointServices::new().with_remote_connector(connector));
    let scope = alice();

    h.registry.rate_resource(&scope, "/remote/a", 4).unwrap();

    assert_eq!(scope.user(), "alice");
    assert_eq!(remote.get_rating(&scope, "/local/data/a", "remote-admin").unwrap(), 4);
    assert_eq!(remote.get_rating(&scope, "/local/data/a", "alice").unwrap(), 0);
    assert_eq!(h.registry.get_rating(&scope, "/remote/a", "alice").unwrap(), 4);
    assert_eq!(h.registry.get_average_rating(&scope, "/remote/a").unwrap(), 4.0);
}

#[test]
fn associations_are_rewritten_on_the_way_back() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();

    h.registry
        .add_association(&scope, "/remote/a", "/remote/b", "depends")
        .unwrap();
    let stored = remote.get_all_associations(&scope, "/local/data/a").unwrap();
    assert_eq!(stored[0].destination_path, "/local/data/b");

    let seen = h.registry.get_associations(&scope, "/remote/a", "depends").unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].source_path, "/remote/a");
    assert_eq!(seen[0].destination_path, "/remote/b");

    h.registry
        .remove_association(&scope, "/remote/a", "/remote/b", "depends")
        .unwrap();
    assert!(h.registry.get_all_associations(&scope, "/remote/a").unwrap().is_empty());
}

#[test]
fn secondary_operations_degrade_when_the_mount_is_unreachable() {
    let h = remote_harness(Arc::new(Unreachable));
    let scope = alice();

    assert!(h.registry.get_tags(&scope, "/remote/a").unwrap().is_empty());
    assert!(h.registry.get_comments(&scope, "/remote/a").unwrap().is_empty());
    assert!(h.registry.get_all_associations(&scope, "/remote/a").unwrap().is_empty());
    assert_eq!(h.registry.get_rating(&scope, "/remote/a", "alice").unwrap(), 0);
    assert_eq!(h.registry.get_average_rating(&scope, "/remote/a").unwrap(), 0.0);
    assert!(!h.registry.resource_exists(&scope, "/remote/a").unwrap());

    h.registry
        .add_association(&scope, "/remote/a", "/remote/b", "depends")
        .unwrap();
    h.registry
        .import_resource(&scope, "/remote/imported", "https://example.com/x.xml", Resource::new(""))
        .unwrap();

    assert!(matches!(
        h.registry.apply_tag(&scope, "/remote/a", "hot"),
        Err(RegistryError::Delegate { .. })
    ));
    assert!(matches!(
        h.registry.rate_resource(&scope, "/remote/a", 3),
        Err(RegistryError::Delegate { .. })
    ));
    assert!(matches!(
        h.registry.add_comment(&scope, "/remote/a", Comment::new("x", "alice")),
        Err(RegistryError::Delegate { .. })
    ));
    assert!(matches!(
        h.registry.execute_query(&scope, None, &QueryParams::new()),
        Err(RegistryError::Delegate { .. })
    ));
}

#[test]
fn verified_existence_ignores_link_restoration_markers() {
    let remote = seeded_remote();
    let scope = alice();
    remote
        .put(
            &scope,
            "/local/data/pending",
            Resource::new("").with_property(REGISTRY_LINK_RESTORATION, "true"),
        )
        .unwrap();
    let h = remote_harness(Arc::new(remote));

    assert!(h.registry.resource_exists(&scope, "/remote/pending").unwrap());
    assert!(!h
        .handler
        .resource_exists_verified(&scope, h.registry.as_ref(), "/remote/pending"));
    assert!(h
        .handler
        .resource_exists_verified(&scope, h.registry.as_ref(), "/remote/a"));
}

// ─── dump and restore ────────────────────────────────────────────────────────

#[test]
fn dump_and_restore_go_through_the_mount() {
    let remote = seeded_remote();
    let h = remote_harness(Arc::new(remote.clone()));
    let scope = alice();

    let mut archive = Vec::new();
    h.registry.dump(&scope, "/remote/a", &mut archive).unwrap();
    assert!(!archive.is_empty());

    h.registry
        .restore(&scope, "/remote/restored", &mut archive.as_slice())
        .unwrap();
    assert_eq!(remote.get(&scope, "/local/data/restored").unwrap().bytes(), b"alpha");
    assert!(!h.local.resource_exists(&scope, "/remote/restored").unwrap());
}

#[test]
fn lite_dump_goes_through_the_mount_and_counts_bytes() {
    let probe = Probe::new(seeded_remote());
    let h = remote_harness(probe.clone());
    let scope = alice();

    let mut archive = Vec::new();
    let written = {
        let mut ctx = RequestContext::new(&scope, h.registry.as_ref(), &h.local)
            .with_path("/remote/a")
            .with_dump_writer(&mut archive);
        h.handler.dump_lite(&mut ctx).unwrap();
        assert!(ctx.processing_complete());
        ctx.bytes_written
    };

    assert_eq!(probe.count("dump_lite"), 1);
    assert_eq!(probe.count("dump"), 0);
    assert!(!archive.is_empty());
    assert_eq!(written, archive.len() as u64);
}

#[test]
fn failed_dump_is_wrapped() {
    let h = remote_harness(Arc::new(Unreachable));
    let mut out = Vec::new();
    let err = h.registry.dump(&alice(), "/remote/a", &mut out).unwrap_err();
    assert_eq!(err.to_string(), "Unable to dump content");
}
