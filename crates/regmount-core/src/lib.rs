//! # regmount-core
//!
//! Resource model, error type, per-request scope and handler chain shared by
//! every RegMount crate. Stores implement [`RegistryStore`]; interceptors
//! implement [`Handler`] and are registered with a [`HandlerManager`];
//! [`HandledRegistry`] ties the two together.

pub mod chain;
pub mod constants;
pub mod context;
pub mod error;
pub mod handler;
pub mod registry;
pub mod scope;
pub mod service;
pub mod store;
pub mod types;
pub mod user;

pub use chain::{HandlerChain, HandlerManager, HandlerPhase};
pub use context::RequestContext;
pub use error::{BoxError, RegistryError};
pub use handler::{is_within, Filter, Handler, MatchAll, Operation, PassThrough, PathPrefixFilter};
pub use registry::HandledRegistry;
pub use scope::{single_path_map, HandlerId, PathMap, RequestScope, Session};
pub use service::{
    EmbeddedRegistryFactory, EmbeddedRegistryService, EmbeddedSettings, MountEntry,
    MountEntryTarget, MountRegistry, RegistryProvider, RemoteConnector, RemoteTarget,
    TransactionScope,
};
pub use store::RegistryStore;
pub use types::{
    Association, Comment, Content, QueryParams, Resource, Tag, TaggedResourcePath, TenantId,
    SUPER_TENANT_ID,
};
pub use user::UserScopedStore;
