//! # regmount-store
//!
//! In-memory registry backends for RegMount.
//!
//! - [`MemoryStore`]: a thread-safe hierarchical `RegistryStore` with links,
//!   tags, comments, ratings, associations and JSON dump/restore.
//! - [`MemoryEmbeddedFactory`]: opens embedded registries over memory stores,
//!   one per database configuration, sharing a counting
//!   [`NestedTransactions`] scope.

pub mod embedded;
pub mod memory;

pub use embedded::{MemoryEmbeddedFactory, MemoryEmbeddedService, NestedTransactions};
pub use memory::{DumpArchive, DumpEntry, MemoryStore, DUMP_VERSION, SOURCE_URL_PROPERTY};
