//! Collaborator traits a mount consumes: transactions, embedded registries,
//! registry providers, remote connectors and the mount-entry advertiser.

use std::sync::Arc;

use crate::error::RegistryError;
use crate::scope::{PathMap, RequestScope};
use crate::store::RegistryStore;
use crate::types::TenantId;

/// Nested-transaction contract of the local registry.
pub trait TransactionScope: Send + Sync {
    /// Open a nested unit of work scoped to the paths in `map`.
    fn push_nested(&self, map: &PathMap);

    /// Close the innermost nested unit of work.
    fn pop_nested(&self);
}

/// Settings applied when opening an embedded registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EmbeddedSettings {
    pub registry_root: Option<String>,
    pub read_only: bool,
    pub cache_enabled: bool,
    /// Named database configuration to select.
    pub db_config: Option<String>,
}

/// An embedded (same-process) registry instance.
pub trait EmbeddedRegistryService: Send + Sync {
    /// A registry acting as `user` within `tenant_id`.
    fn user_registry(
        &self,
        user: &str,
        tenant_id: TenantId,
    ) -> Result<Arc<dyn RegistryStore>, RegistryError>;

    fn transactions(&self) -> Arc<dyn TransactionScope>;
}

/// Opens embedded registries for a given set of settings.
pub trait EmbeddedRegistryFactory: Send + Sync {
    fn open(
        &self,
        settings: &EmbeddedSettings,
    ) -> Result<Arc<dyn EmbeddedRegistryService>, RegistryError>;
}

/// Supplies registry instances of one remote registry type.
pub trait RegistryProvider: Send + Sync {
    /// Type key this provider answers for (matched against a mount's `registryType`).
    fn registry_type(&self) -> &str;

    fn get_registry(
        &self,
        url: &str,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Arc<dyn RegistryStore>, RegistryError>;
}

/// Where and how to reach a remote registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub url: String,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub read_only: bool,
    pub cache_enabled: bool,
}

/// Builds clients for remote registries. The wire protocol is the
/// connector's business.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, target: &RemoteTarget) -> Result<Arc<dyn RegistryStore>, RegistryError>;
}

/// What a mount entry points at inside the target registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountEntryTarget {
    /// A subtree of the target registry.
    SubPath(String),
    /// The whole target registry.
    FullMount,
}

/// A mount as advertised to the rest of the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub mount_point: String,
    /// Mount id the entry targets.
    pub target: String,
    pub sub_path: MountEntryTarget,
    pub author: Option<String>,
}

/// Records mount entries so other parts of the system can discover mounts.
pub trait MountRegistry: Send + Sync {
    /// Advertise `entry`, writing through `system` (a registry acting as the
    /// system user).
    fn add_mount_entry(
        &self,
        system: &dyn RegistryStore,
        scope: &RequestScope,
        entry: &MountEntry,
    ) -> Result<(), RegistryError>;
}
