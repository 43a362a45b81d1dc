//! Mount configuration: the immutable `MountConfig`, its fluent builder, and
//! YAML mount files.
//!
//! # Example
//!
//! ```rust
//! use regmount_mount::MountConfig;
//!
//! let config = MountConfig::builder()
//!     .id("instance-a")
//!     .mount_point("/remote")
//!     .sub_path("/local/data/")
//!     .remote(true)
//!     .connection_url("https://registry.example.com/registry/")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.sub_path(), Some("/local/data"));
//! assert_eq!(config.connection_url(), Some("https://registry.example.com/registry"));
//! ```

use std::collections::HashSet;
use std::path::Path;

use regmount_core::constants::ROOT_PATH;
use regmount_core::RegistryError;
use serde::{Deserialize, Serialize};

/// Root becomes empty; one trailing separator is stripped.
pub fn normalize_sub_path(sub_path: &str) -> String {
    if sub_path == ROOT_PATH {
        String::new()
    } else if sub_path.len() > 1 && sub_path.ends_with('/') {
        sub_path[..sub_path.len() - 1].to_string()
    } else {
        sub_path.to_string()
    }
}

// ─── MountConfig ─────────────────────────────────────────────────────────────

/// Configuration of one mount. Immutable once built.
///
/// Equality and hashing cover every field, so two configs are duplicates
/// exactly when they would mount the same thing the same way.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MountConfig {
    id: String,
    connection_url: Option<String>,
    mount_point: String,
    user_name: Option<String>,
    password: Option<String>,
    sub_path: Option<String>,
    author: Option<String>,
    db_config: Option<String>,
    read_only: bool,
    cache_enabled: bool,
    registry_root: Option<String>,
    remote: bool,
    registry_type: Option<String>,
}

impl MountConfig {
    pub fn builder() -> MountConfigBuilder {
        MountConfigBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection_url(&self) -> Option<&str> {
        self.connection_url.as_deref()
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Normalized sub-path. `Some("")` means the target's root was mounted
    /// explicitly; `None` means no sub-path was configured.
    pub fn sub_path(&self) -> Option<&str> {
        self.sub_path.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn db_config(&self) -> Option<&str> {
        self.db_config.as_deref()
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn registry_root(&self) -> Option<&str> {
        self.registry_root.as_deref()
    }

    pub fn remote(&self) -> bool {
        self.remote
    }

    pub fn registry_type(&self) -> Option<&str> {
        self.registry_type.as_deref()
    }

    /// Key used to deduplicate federated queries within one request.
    pub fn query_key(&self) -> String {
        format!("{}{}", self.id, self.mount_point)
    }

    /// Connection URL for log messages; embedded mounts have none.
    pub fn display_url(&self) -> &str {
        self.connection_url.as_deref().unwrap_or("embedded")
    }

    /// The same mount, attached at `mount_point` instead.
    pub fn relocated(&self, mount_point: impl Into<String>) -> Result<Self, RegistryError> {
        let mount_point = mount_point.into();
        validate_mount_point(&mount_point)?;
        Ok(Self {
            mount_point,
            ..self.clone()
        })
    }
}

impl std::fmt::Debug for MountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountConfig")
            .field("id", &self.id)
            .field("connection_url", &self.connection_url)
            .field("mount_point", &self.mount_point)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("sub_path", &self.sub_path)
            .field("author", &self.author)
            .field("db_config", &self.db_config)
            .field("read_only", &self.read_only)
            .field("cache_enabled", &self.cache_enabled)
            .field("registry_root", &self.registry_root)
            .field("remote", &self.remote)
            .field("registry_type", &self.registry_type)
            .finish()
    }
}

// ─── MountConfigBuilder ──────────────────────────────────────────────────────

/// Fluent builder for [`MountConfig`].
#[derive(Debug, Default, Clone)]
pub struct MountConfigBuilder {
    id: Option<String>,
    connection_url: Option<String>,
    mount_point: Option<String>,
    user_name: Option<String>,
    password: Option<String>,
    sub_path: Option<String>,
    author: Option<String>,
    db_config: Option<String>,
    read_only: bool,
    cache_enabled: bool,
    registry_root: Option<String>,
    remote: bool,
    registry_type: Option<String>,
}

impl MountConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the instance identifier the mount targets.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the remote connection URL. One trailing `/` is dropped.
    pub fn connection_url(mut self, url: impl Into<String>) -> Self {
        self.connection_url = Some(url.into());
        self
    }

    pub fn mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = Some(mount_point.into());
        self
    }

    pub fn user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the target sub-path (normalized on build).
    pub fn sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn db_config(mut self, db_config: impl Into<String>) -> Self {
        self.db_config = Some(db_config.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn cache_enabled(mut self, cache_enabled: bool) -> Self {
        self.cache_enabled = cache_enabled;
        self
    }

    pub fn registry_root(mut self, registry_root: impl Into<String>) -> Self {
        self.registry_root = Some(registry_root.into());
        self
    }

    /// Mark the mount as remote (reached through a connector or provider).
    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn registry_type(mut self, registry_type: impl Into<String>) -> Self {
        self.registry_type = Some(registry_type.into());
        self
    }

    /// Validate and build the `MountConfig`.
    pub fn build(self) -> Result<MountConfig, RegistryError> {
        let id = self.id.ok_or(RegistryError::MissingArgument("id"))?;
        let mount_point = self
            .mount_point
            .ok_or(RegistryError::MissingArgument("mountPoint"))?;
        validate_mount_point(&mount_point)?;
        if self.remote && self.connection_url.is_none() {
            return Err(RegistryError::MissingArgument("connectionUrl"));
        }

        let connection_url = self.connection_url.map(|url| match url.strip_suffix('/') {
            Some(stripped) => stripped.to_string(),
            None => url,
        });

        Ok(MountConfig {
            id,
            connection_url,
            mount_point,
            user_name: self.user_name,
            password: self.password,
            sub_path: self.sub_path.as_deref().map(normalize_sub_path),
            author: self.author,
            db_config: self.db_config,
            read_only: self.read_only,
            cache_enabled: self.cache_enabled,
            registry_root: self.registry_root,
            remote: self.remote,
            registry_type: self.registry_type,
        })
    }
}

fn validate_mount_point(mount_point: &str) -> Result<(), RegistryError> {
    let reason = if !mount_point.starts_with('/') {
        "mount point must be absolute"
    } else if mount_point == ROOT_PATH {
        "the root collection cannot be mounted over"
    } else if mount_point.ends_with('/') {
        "mount point must not end with a separator"
    } else if mount_point.contains(';') {
        "mount point must not carry path parameters"
    } else {
        return Ok(());
    };
    Err(RegistryError::InvalidPath {
        path: mount_point.to_string(),
        reason: reason.into(),
    })
}

// ─── Mount files ─────────────────────────────────────────────────────────────

/// A YAML document listing mounts.
///
/// ```yaml
/// mounts:
///   - id: instance-a
///     mountPoint: /remote
///     subPath: /local/data
///     remote: true
///     connectionUrl: https://registry.example.com/registry
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountFile {
    #[serde(default)]
    pub mounts: Vec<MountDefinition>,
}

/// One entry of a [`MountFile`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountDefinition {
    pub id: String,
    pub mount_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_config: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_root: Option<String>,
}

impl MountDefinition {
    pub fn to_config(&self) -> Result<MountConfig, RegistryError> {
        let mut builder = MountConfig::builder()
            .id(self.id.clone())
            .mount_point(self.mount_point.clone())
            .remote(self.remote)
            .read_only(self.read_only)
            .cache_enabled(self.cache_enabled);
        if let Some(v) = &self.sub_path {
            builder = builder.sub_path(v.clone());
        }
        if let Some(v) = &self.connection_url {
            builder = builder.connection_url(v.clone());
        }
        if let Some(v) = &self.user_name {
            builder = builder.user_name(v.clone());
        }
        if let Some(v) = &self.password {
            builder = builder.password(v.clone());
        }
        if let Some(v) = &self.registry_type {
            builder = builder.registry_type(v.clone());
        }
        if let Some(v) = &self.author {
            builder = builder.author(v.clone());
        }
        if let Some(v) = &self.db_config {
            builder = builder.db_config(v.clone());
        }
        if let Some(v) = &self.registry_root {
            builder = builder.registry_root(v.clone());
        }
        builder.build()
    }
}

impl MountFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RegistryError::configuration_caused_by("Invalid mount file", e))
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(RegistryError::Io)?;
        Self::from_yaml(&content)
    }

    /// Build every mount, failing on the first invalid definition.
    pub fn configs(&self) -> Result<Vec<MountConfig>, RegistryError> {
        self.mounts.iter().map(MountDefinition::to_config).collect()
    }

    /// Configs that repeat an earlier entry exactly.
    pub fn duplicates(&self) -> Result<Vec<MountConfig>, RegistryError> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for config in self.configs()? {
            if !seen.insert(config.clone()) {
                duplicates.push(config);
            }
        }
        Ok(duplicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_path_normalization() {
        assert_eq!(normalize_sub_path("/"), "");
        assert_eq!(normalize_sub_path("/local/data/"), "/local/data");
        assert_eq!(normalize_sub_path("/local/data"), "/local/data");
        assert_eq!(normalize_sub_path(""), "");
    }

    #[test]
    fn builder_requires_id_and_mount_point() {
        let err = MountConfig::builder().mount_point("/m").build().unwrap_err();
        assert!(matches!(err, RegistryError::MissingArgument("id")));
        let err = MountConfig::builder().id("a").build().unwrap_err();
        assert!(matches!(err, RegistryError::MissingArgument("mountPoint")));
    }

    #[test]
    fn builder_rejects_bad_mount_points() {
        for bad in ["relative", "/", "/trailing/", "/a;comments:1"] {
            let err = MountConfig::builder()
                .id("a")
                .mount_point(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidPath { .. }), "{bad}");
        }
    }

    #[test]
    fn remote_mounts_need_a_url() {
        let err = MountConfig::builder()
            .id("a")
            .mount_point("/m")
            .remote(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingArgument("connectionUrl")));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = MountConfig::builder()
            .id("a")
            .mount_point("/m")
            .password("secret")
            .build()
            .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn mount_file_parses_camel_case_and_reports_duplicates() {
        let yaml = r#"
mounts:
  - id: instance-a
    mountPoint: /remote
    subPath: /local/data/
    remote: true
    connectionUrl: https://registry.example.com/registry/
    userName: admin
  - id: instance-a
    mountPoint: /remote
    subPath: /local/data
    remote: true
    connectionUrl: https://registry.example.com/registry
    userName: admin
  - id: archive
    mountPoint: /archive
    dbConfig: archive-db
    readOnly: true
"#;
        let file = MountFile::from_yaml(yaml).unwrap();
        let configs = file.configs().unwrap();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[0], configs[1]);
        assert!(configs[2].read_only());
        assert_eq!(configs[2].db_config(), Some("archive-db"));

        let duplicates = file.duplicates().unwrap();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].id(), "instance-a");
    }

    #[test]
    fn relocation_keeps_everything_but_the_mount_point() {
        let config = MountConfig::builder()
            .id("instance-a")
            .mount_point("/remote")
            .sub_path("/local/data")
            .remote(true)
            .connection_url("https://registry.example.com/registry/")
            .build()
            .unwrap();
        let moved = config.relocated("/moved").unwrap();
        assert_eq!(moved.mount_point(), "/moved");
        assert_eq!(moved.id(), "instance-a");
        assert_eq!(moved.sub_path(), Some("/local/data"));
        assert_eq!(moved.connection_url(), config.connection_url());
        assert!(config.relocated("/").is_err());
    }

    #[test]
    fn invalid_yaml_is_a_configuration_error() {
        let err = MountFile::from_yaml("mounts: [").unwrap_err();
        assert!(err.is_configuration());
    }
}
