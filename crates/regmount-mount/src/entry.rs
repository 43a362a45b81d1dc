//! Mount-entry advertisement into the local registry.

use regmount_core::constants::{MOUNT_MEDIA_TYPE, SYSTEM_MOUNT_PATH};
use regmount_core::{
    MountEntry, MountEntryTarget, MountRegistry, RegistryError, RegistryStore, RequestScope,
    Resource,
};
use tracing::debug;

/// Writes one resource per mount under a system collection, so other parts of
/// the system can discover which mounts exist.
///
/// The entry for mount point `/a/b` lives at `<root>/-a-b`. An existing entry
/// is never overwritten.
#[derive(Debug, Clone)]
pub struct StoreMountRegistry {
    root: String,
    registry_root: Option<String>,
}

impl StoreMountRegistry {
    pub fn new() -> Self {
        Self {
            root: SYSTEM_MOUNT_PATH.to_string(),
            registry_root: None,
        }
    }

    /// Write entries below `root` instead of the default system collection.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Record mount points relative to `registry_root`.
    pub fn with_registry_root(mut self, registry_root: impl Into<String>) -> Self {
        self.registry_root = Some(registry_root.into());
        self
    }

    /// Path of the entry advertising `mount_point`.
    pub fn entry_path(&self, mount_point: &str) -> String {
        let relative = match self.registry_root.as_deref() {
            Some(root) if root != "/" => mount_point.strip_prefix(root).unwrap_or(mount_point),
            _ => mount_point,
        };
        format!("{}/{}", self.root, relative.replace('/', "-"))
    }
}

impl Default for StoreMountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MountRegistry for StoreMountRegistry {
    fn add_mount_entry(
        &self,
        system: &dyn RegistryStore,
        scope: &RequestScope,
        entry: &MountEntry,
    ) -> Result<(), RegistryError> {
        let path = self.entry_path(&entry.mount_point);
        if system.resource_exists(scope, &path)? {
            debug!(%path, mount = %entry.mount_point, "mount entry already present");
            return Ok(());
        }

        let mut resource = Resource::new(path.as_str())
            .with_media_type(MOUNT_MEDIA_TYPE)
            .with_property("path", entry.mount_point.as_str())
            .with_property("target", entry.target.as_str());
        if let Some(author) = &entry.author {
            resource.set_property("author", author.as_str());
        }
        if let MountEntryTarget::SubPath(sub_path) = &entry.sub_path {
            resource.set_property("subPath", sub_path.as_str());
        }
        system.put(scope, &path, resource)?;
        debug!(%path, mount = %entry.mount_point, "mount entry added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regmount_store::MemoryStore;

    fn entry(sub_path: MountEntryTarget) -> MountEntry {
        MountEntry {
            mount_point: "/remote/data".into(),
            target: "instance-a".into(),
            sub_path,
            author: Some("admin".into()),
        }
    }

    #[test]
    fn entry_path_flattens_mount_point() {
        let registry = StoreMountRegistry::new();
        assert_eq!(
            registry.entry_path("/remote/data"),
            "/_system/local/repository/mounts/-remote-data"
        );
        let rooted = StoreMountRegistry::new().with_registry_root("/tenant1");
        assert_eq!(
            rooted.entry_path("/tenant1/remote"),
            "/_system/local/repository/mounts/-remote"
        );
    }

    #[test]
    fn writes_entry_once() {
        let store = MemoryStore::new();
        let scope = RequestScope::default();
        let registry = StoreMountRegistry::new();

        registry
            .add_mount_entry(&store, &scope, &entry(MountEntryTarget::SubPath("/local".into())))
            .unwrap();
        let path = registry.entry_path("/remote/data");
        let written = store.get(&scope, &path).unwrap();
        assert_eq!(written.media_type.as_deref(), Some(MOUNT_MEDIA_TYPE));
        assert_eq!(written.property("target"), Some("instance-a"));
        assert_eq!(written.property("subPath"), Some("/local"));
        assert_eq!(written.property("author"), Some("admin"));

        registry
            .add_mount_entry(&store, &scope, &entry(MountEntryTarget::FullMount))
            .unwrap();
        let unchanged = store.get(&scope, &path).unwrap();
        assert_eq!(unchanged.property("subPath"), Some("/local"));
    }

    #[test]
    fn full_mount_has_no_sub_path() {
        let store = MemoryStore::new();
        let scope = RequestScope::default();
        let registry = StoreMountRegistry::new();
        registry
            .add_mount_entry(&store, &scope, &entry(MountEntryTarget::FullMount))
            .unwrap();
        let written = store.get(&scope, &registry.entry_path("/remote/data")).unwrap();
        assert_eq!(written.property("subPath"), None);
    }
}
