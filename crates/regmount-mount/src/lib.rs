//! # regmount-mount
//!
//! Transparent mounting of registries into a local namespace.
//!
//! A [`MountHandler`] sits in the handler chain of a local registry and serves
//! every operation at or below its mount point from another registry: an
//! embedded local instance, a remote registry reached through a connector, or
//! one supplied by a [`RegistryProvider`](regmount_core::RegistryProvider).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use regmount_core::{HandledRegistry, HandlerManager, RegistryStore, RequestScope};
//! use regmount_mount::{EndpointServices, MountConfig, MountHandler};
//! use regmount_store::{MemoryEmbeddedFactory, MemoryStore};
//!
//! let manager = Arc::new(HandlerManager::new());
//! let registry = HandledRegistry::new(Arc::new(MemoryStore::new()), manager.clone());
//!
//! let config = MountConfig::builder()
//!     .id("archive")
//!     .mount_point("/archive")
//!     .sub_path("/data")
//!     .build()?;
//! let services = EndpointServices::new()
//!     .with_embedded_factory(Arc::new(MemoryEmbeddedFactory::new()));
//! MountHandler::new(config, services).install(&manager);
//!
//! let scope = RequestScope::default();
//! let exists = registry.resource_exists(&scope, "/archive/report.xml")?;
//! # Ok::<(), regmount_core::RegistryError>(())
//! ```

pub mod config;
pub mod endpoint;
pub mod entry;
pub mod guard;
pub mod handler;
pub mod io;
pub mod path;
pub mod scope;

pub use config::{normalize_sub_path, MountConfig, MountConfigBuilder, MountDefinition, MountFile};
pub use endpoint::{Backend, EndpointMode, EndpointServices, MountEndpoint, MountTarget};
pub use entry::StoreMountRegistry;
pub use guard::{ActiveCall, ReentrancyGuard};
pub use handler::{MountHandler, QUERIED_MOUNTS_ATTRIBUTE};
pub use io::{CountingReader, CountingWriter};
pub use path::PathTranslator;
pub use scope::NestedOperation;
