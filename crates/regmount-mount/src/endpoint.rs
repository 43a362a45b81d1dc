//! Endpoint resolution: which registry a mount delegates to.
//!
//! Three modes, chosen from the [`MountConfig`]:
//! - **Provider**: remote mount with a `registryType` that a registered
//!   [`RegistryProvider`] answers for.
//! - **Remote**: any other remote mount, reached through the
//!   [`RemoteConnector`] at `connectionUrl`.
//! - **Embedded**: a local registry opened through the
//!   [`EmbeddedRegistryFactory`], scoped per caller and tenant.
//!
//! The backend is created once and memoized; the mount entry is advertised
//! once per endpoint, the first time the endpoint is resolved.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use regmount_core::constants::SYSTEM_USER;
use regmount_core::{
    EmbeddedRegistryFactory, EmbeddedRegistryService, EmbeddedSettings, MountEntry,
    MountEntryTarget, MountRegistry, PathMap, RegistryError, RegistryProvider, RegistryStore,
    RemoteConnector, RemoteTarget, RequestScope, TransactionScope, UserScopedStore,
};
use tracing::{debug, error, info};

use crate::config::MountConfig;
use crate::scope::NestedOperation;

// ─── EndpointServices ────────────────────────────────────────────────────────

/// Collaborators an endpoint may resolve through.
#[derive(Clone, Default)]
pub struct EndpointServices {
    providers: Vec<Arc<dyn RegistryProvider>>,
    remote: Option<Arc<dyn RemoteConnector>>,
    embedded: Option<Arc<dyn EmbeddedRegistryFactory>>,
    mount_registry: Option<Arc<dyn MountRegistry>>,
}

impl EndpointServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn RegistryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_remote_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.remote = Some(connector);
        self
    }

    pub fn with_embedded_factory(mut self, factory: Arc<dyn EmbeddedRegistryFactory>) -> Self {
        self.embedded = Some(factory);
        self
    }

    pub fn with_mount_registry(mut self, mount_registry: Arc<dyn MountRegistry>) -> Self {
        self.mount_registry = Some(mount_registry);
        self
    }

    fn provider_for(&self, registry_type: &str) -> Option<&Arc<dyn RegistryProvider>> {
        self.providers
            .iter()
            .find(|p| p.registry_type() == registry_type)
    }
}

impl std::fmt::Debug for EndpointServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider_types: Vec<&str> = self.providers.iter().map(|p| p.registry_type()).collect();
        f.debug_struct("EndpointServices")
            .field("providers", &provider_types)
            .field("remote", &self.remote.is_some())
            .field("embedded", &self.embedded.is_some())
            .field("mount_registry", &self.mount_registry.is_some())
            .finish()
    }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    Provider,
    Remote,
    Embedded,
}

/// The memoized handle an endpoint resolved to.
pub enum Backend {
    Provider(Arc<dyn RegistryStore>),
    Remote(Arc<dyn RegistryStore>),
    Embedded(Arc<dyn EmbeddedRegistryService>),
}

impl Backend {
    pub fn mode(&self) -> EndpointMode {
        match self {
            Self::Provider(_) => EndpointMode::Provider,
            Self::Remote(_) => EndpointMode::Remote,
            Self::Embedded(_) => EndpointMode::Embedded,
        }
    }
}

/// A registry ready for one delegate call.
pub struct MountTarget {
    pub store: Arc<dyn RegistryStore>,
    /// Present only for embedded (local) mounts.
    pub transactions: Option<Arc<dyn TransactionScope>>,
}

impl MountTarget {
    /// Open a nested operation around a call on this target.
    pub fn nested<'s>(&self, scope: &'s RequestScope, map: PathMap) -> NestedOperation<'s> {
        NestedOperation::begin(scope, self.transactions.clone(), map)
    }

    pub fn is_local(&self) -> bool {
        self.transactions.is_some()
    }
}

// ─── MountEndpoint ───────────────────────────────────────────────────────────

pub struct MountEndpoint {
    config: MountConfig,
    services: EndpointServices,
    backend: RwLock<Option<Arc<Backend>>>,
    registered: AtomicBool,
}

impl MountEndpoint {
    pub fn new(config: MountConfig, services: EndpointServices) -> Self {
        Self {
            config,
            services,
            backend: RwLock::new(None),
            registered: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// An endpoint for `config` that shares this one's services and any
    /// backend already resolved. The new mount point is advertised afresh.
    pub fn relocated(&self, config: MountConfig) -> Self {
        Self {
            config,
            services: self.services.clone(),
            backend: RwLock::new(self.backend.read().unwrap().clone()),
            registered: AtomicBool::new(false),
        }
    }

    /// The mode this endpoint resolves to.
    pub fn mode(&self) -> EndpointMode {
        if !self.config.remote() {
            return EndpointMode::Embedded;
        }
        match self.config.registry_type() {
            Some(t) if self.services.provider_for(t).is_some() => EndpointMode::Provider,
            _ => EndpointMode::Remote,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Drop the memoized backend; the next resolution creates a new one.
    pub fn invalidate(&self) {
        if self.backend.write().unwrap().take().is_some() {
            debug!(mount = %self.config.mount_point(), "endpoint invalidated");
        }
    }

    /// The memoized backend, created on first use.
    pub fn backend(&self) -> Result<Arc<Backend>, RegistryError> {
        if let Some(backend) = self.backend.read().unwrap().as_ref() {
            return Ok(Arc::clone(backend));
        }
        let mut slot = self.backend.write().unwrap();
        if let Some(backend) = slot.as_ref() {
            return Ok(Arc::clone(backend));
        }
        let backend = Arc::new(self.create_backend()?);
        info!(
            mount = %self.config.mount_point(),
            url = %self.config.display_url(),
            mode = ?backend.mode(),
            "mount endpoint resolved"
        );
        *slot = Some(Arc::clone(&backend));
        Ok(backend)
    }

    /// Resolve the registry to delegate to for the current caller, advertising
    /// the mount on first use. `registry` is the registry the request entered
    /// through; the mount entry is written through it.
    pub fn resolve(
        &self,
        scope: &RequestScope,
        registry: &dyn RegistryStore,
    ) -> Result<MountTarget, RegistryError> {
        let backend = self.backend()?;
        self.ensure_registered(scope, registry);

        match backend.as_ref() {
            Backend::Provider(store) => Ok(MountTarget {
                store: Arc::clone(store),
                transactions: None,
            }),
            Backend::Remote(store) => {
                let user = self
                    .config
                    .user_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| scope.user());
                Ok(MountTarget {
                    store: Arc::new(UserScopedStore::new(
                        Arc::clone(store),
                        user,
                        scope.tenant_id(),
                    )),
                    transactions: None,
                })
            }
            Backend::Embedded(service) => Ok(MountTarget {
                store: service.user_registry(&scope.user(), scope.caller_tenant_id())?,
                transactions: Some(service.transactions()),
            }),
        }
    }

    fn create_backend(&self) -> Result<Backend, RegistryError> {
        if !self.config.remote() {
            return self.open_embedded();
        }

        let url = self
            .config
            .connection_url()
            .ok_or(RegistryError::MissingArgument("connectionUrl"))?;

        if let Some(provider) = self
            .config
            .registry_type()
            .and_then(|t| self.services.provider_for(t))
        {
            let store =
                provider.get_registry(url, self.config.user_name(), self.config.password())?;
            return Ok(Backend::Provider(store));
        }

        url::Url::parse(url).map_err(|e| {
            RegistryError::configuration_caused_by(
                format!("Unable to connect to the remote registry at {url}"),
                e,
            )
        })?;
        let connector = self.services.remote.as_ref().ok_or_else(|| {
            RegistryError::configuration(format!("No remote connector available for {url}"))
        })?;
        let target = RemoteTarget {
            url: url.to_string(),
            user_name: self.config.user_name().map(str::to_string),
            password: self.config.password().map(str::to_string),
            read_only: self.config.read_only(),
            cache_enabled: self.config.cache_enabled(),
        };
        let store = connector.connect(&target).map_err(|e| {
            RegistryError::configuration_caused_by(
                format!("Unable to connect to the remote registry at {url}"),
                e,
            )
        })?;
        Ok(Backend::Remote(store))
    }

    fn open_embedded(&self) -> Result<Backend, RegistryError> {
        let factory = self.services.embedded.as_ref().ok_or_else(|| {
            RegistryError::configuration(format!(
                "No embedded registry available for mount {}",
                self.config.mount_point()
            ))
        })?;
        let settings = EmbeddedSettings {
            registry_root: self.config.registry_root().map(str::to_string),
            read_only: self.config.read_only(),
            cache_enabled: self.config.cache_enabled(),
            db_config: self.config.db_config().map(str::to_string),
        };
        Ok(Backend::Embedded(factory.open(&settings)?))
    }

    /// Advertise the mount once. Failures are logged and the flag is reset so
    /// a later resolution retries.
    fn ensure_registered(&self, scope: &RequestScope, registry: &dyn RegistryStore) {
        let Some(mount_registry) = self.services.mount_registry.as_ref() else {
            return;
        };
        if self
            .registered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let entry = MountEntry {
            mount_point: self.config.mount_point().to_string(),
            target: self.config.id().to_string(),
            sub_path: match self.config.sub_path() {
                Some(sub_path) => MountEntryTarget::SubPath(sub_path.to_string()),
                None => MountEntryTarget::FullMount,
            },
            author: self.config.author().map(str::to_string),
        };
        let result = scope.as_user(SYSTEM_USER, scope.tenant_id(), || {
            mount_registry.add_mount_entry(registry, scope, &entry)
        });
        if let Err(e) = result {
            error!(
                mount = %self.config.mount_point(),
                error = %e,
                "Unable to add mount entry"
            );
            self.registered.store(false, Ordering::SeqCst);
        }
    }
}

impl std::fmt::Debug for MountEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountEndpoint")
            .field("config", &self.config)
            .field("services", &self.services)
            .field("resolved", &self.backend.read().unwrap().is_some())
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regmount_core::Resource;
    use std::sync::atomic::AtomicUsize;

    struct NullStore;

    impl RegistryStore for NullStore {
        fn get(&self, _scope: &RequestScope, path: &str) -> Result<Resource, RegistryError> {
            Err(RegistryError::not_found(path))
        }

        fn put(
            &self,
            _scope: &RequestScope,
            path: &str,
            _r: Resource,
        ) -> Result<String, RegistryError> {
            Ok(path.to_string())
        }

        fn delete(&self, _scope: &RequestScope, _path: &str) -> Result<(), RegistryError> {
            Ok(())
        }

        fn resource_exists(
            &self,
            _scope: &RequestScope,
            _path: &str,
        ) -> Result<bool, RegistryError> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct CountingConnector(AtomicUsize);

    impl RemoteConnector for CountingConnector {
        fn connect(&self, _target: &RemoteTarget) -> Result<Arc<dyn RegistryStore>, RegistryError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullStore))
        }
    }

    struct AtomProvider;

    impl RegistryProvider for AtomProvider {
        fn registry_type(&self) -> &str {
            "atom"
        }

        fn get_registry(
            &self,
            _url: &str,
            _user: Option<&str>,
            _password: Option<&str>,
        ) -> Result<Arc<dyn RegistryStore>, RegistryError> {
            Ok(Arc::new(NullStore))
        }
    }

    fn remote_config(url: &str) -> MountConfig {
        MountConfig::builder()
            .id("instance-a")
            .mount_point("/remote")
            .remote(true)
            .connection_url(url)
            .build()
            .unwrap()
    }

    #[test]
    fn remote_backend_is_memoized() {
        let connector = Arc::new(CountingConnector::default());
        let endpoint = MountEndpoint::new(
            remote_config("https://registry.example.com/registry"),
            EndpointServices::new().with_remote_connector(connector.clone()),
        );
        let a = endpoint.backend().unwrap();
        let b = endpoint.backend().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.0.load(Ordering::SeqCst), 1);
        assert_eq!(a.mode(), EndpointMode::Remote);

        endpoint.invalidate();
        let c = endpoint.backend().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(connector.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn malformed_url_is_a_configuration_error() {
        let endpoint = MountEndpoint::new(
            remote_config("not a url"),
            EndpointServices::new().with_remote_connector(Arc::new(CountingConnector::default())),
        );
        let err = endpoint.backend().err().unwrap();
        assert!(err.is_configuration());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_connector_is_a_configuration_error() {
        let endpoint = MountEndpoint::new(
            remote_config("https://registry.example.com/registry"),
            EndpointServices::new(),
        );
        assert!(endpoint.backend().err().unwrap().is_configuration());
    }

    #[test]
    fn registry_type_selects_matching_provider() {
        let config = MountConfig::builder()
            .id("a")
            .mount_point("/atom")
            .remote(true)
            .connection_url("https://registry.example.com/atom")
            .registry_type("atom")
            .build()
            .unwrap();
        let services = EndpointServices::new()
            .with_provider(Arc::new(AtomProvider))
            .with_remote_connector(Arc::new(CountingConnector::default()));
        let endpoint = MountEndpoint::new(config, services);
        assert_eq!(endpoint.mode(), EndpointMode::Provider);
        assert_eq!(endpoint.backend().unwrap().mode(), EndpointMode::Provider);

        let unknown = MountConfig::builder()
            .id("a")
            .mount_point("/rest")
            .remote(true)
            .connection_url("https://registry.example.com/rest")
            .registry_type("rest")
            .build()
            .unwrap();
        let endpoint = MountEndpoint::new(
            unknown,
            EndpointServices::new()
                .with_provider(Arc::new(AtomProvider))
                .with_remote_connector(Arc::new(CountingConnector::default())),
        );
        assert_eq!(endpoint.mode(), EndpointMode::Remote);
    }

    #[test]
    fn embedded_mount_without_factory_fails() {
        let config = MountConfig::builder()
            .id("a")
            .mount_point("/local")
            .build()
            .unwrap();
        let endpoint = MountEndpoint::new(config, EndpointServices::new());
        assert_eq!(endpoint.mode(), EndpointMode::Embedded);
        assert!(endpoint.backend().err().unwrap().is_configuration());
    }
}
