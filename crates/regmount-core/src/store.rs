//! The `RegistryStore` trait: the path-addressed registry API every backend
//! (in-memory store, remote client, handler-aware registry) implements.

use std::io::{Read, Write};

use crate::error::RegistryError;
use crate::scope::RequestScope;
use crate::types::{Association, Comment, QueryParams, Resource, Tag, TaggedResourcePath};

fn unsupported<T>(operation: &'static str) -> Result<T, RegistryError> {
    Err(RegistryError::Unsupported { operation })
}

/// A hierarchical, `/`-addressed resource store.
///
/// Every call receives the [`RequestScope`] of the request it runs for, so a
/// store that re-enters a handler chain hands the same scope back.
///
/// Only the four core operations are required; the rest default to
/// [`RegistryError::Unsupported`].
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance serves many requests
/// concurrently.
pub trait RegistryStore: Send + Sync {
    fn get(&self, scope: &RequestScope, path: &str) -> Result<Resource, RegistryError>;

    /// Store `resource` at `path` and return the path it was stored at.
    fn put(&self, scope: &RequestScope, path: &str, resource: Resource)
        -> Result<String, RegistryError>;

    fn delete(&self, scope: &RequestScope, path: &str) -> Result<(), RegistryError>;

    fn resource_exists(&self, scope: &RequestScope, path: &str) -> Result<bool, RegistryError>;

    /// Rename `path`. `new_path` is either absolute or a sibling name.
    fn rename(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _new_path: &str,
    ) -> Result<String, RegistryError> {
        unsupported("rename")
    }

    fn move_resource(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _target: &str,
    ) -> Result<String, RegistryError> {
        unsupported("move")
    }

    fn copy(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _target: &str,
    ) -> Result<String, RegistryError> {
        unsupported("copy")
    }

    fn import_resource(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _source_url: &str,
        _resource: Resource,
    ) -> Result<String, RegistryError> {
        unsupported("import")
    }

    /// Create a link node at `path` pointing at `target` (a path or mount id).
    fn create_link(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _target: &str,
    ) -> Result<(), RegistryError> {
        unsupported("create link")
    }

    fn remove_link(&self, _scope: &RequestScope, _path: &str) -> Result<(), RegistryError> {
        unsupported("remove link")
    }

    fn add_association(
        &self,
        _scope: &RequestScope,
        _source: &str,
        _target: &str,
        _association_type: &str,
    ) -> Result<(), RegistryError> {
        unsupported("add association")
    }

    fn remove_association(
        &self,
        _scope: &RequestScope,
        _source: &str,
        _target: &str,
        _association_type: &str,
    ) -> Result<(), RegistryError> {
        unsupported("remove association")
    }

    fn get_all_associations(
        &self,
        _scope: &RequestScope,
        _path: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        unsupported("get all associations")
    }

    fn get_associations(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _association_type: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        unsupported("get associations")
    }

    fn apply_tag(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _tag: &str,
    ) -> Result<(), RegistryError> {
        unsupported("apply tag")
    }

    fn remove_tag(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _tag: &str,
    ) -> Result<(), RegistryError> {
        unsupported("remove tag")
    }

    fn get_tags(&self, _scope: &RequestScope, _path: &str) -> Result<Vec<Tag>, RegistryError> {
        unsupported("get tags")
    }

    fn get_resource_paths_with_tag(
        &self,
        _scope: &RequestScope,
        _tag: &str,
    ) -> Result<Vec<TaggedResourcePath>, RegistryError> {
        unsupported("get resource paths with tag")
    }

    /// Attach a comment and return its path (`<resource>;comments:<id>`).
    fn add_comment(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _comment: Comment,
    ) -> Result<String, RegistryError> {
        unsupported("add comment")
    }

    fn remove_comment(
        &self,
        _scope: &RequestScope,
        _comment_path: &str,
    ) -> Result<(), RegistryError> {
        unsupported("remove comment")
    }

    fn get_comments(
        &self,
        _scope: &RequestScope,
        _path: &str,
    ) -> Result<Vec<Comment>, RegistryError> {
        unsupported("get comments")
    }

    /// Rate `path` as the scope's current user.
    fn rate_resource(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _rating: u8,
    ) -> Result<(), RegistryError> {
        unsupported("rate resource")
    }

    fn get_rating(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _user: &str,
    ) -> Result<u8, RegistryError> {
        unsupported("get rating")
    }

    fn get_average_rating(&self, _scope: &RequestScope, _path: &str) -> Result<f32, RegistryError> {
        unsupported("get average rating")
    }

    /// Run a query and return a collection whose children are the matches.
    fn execute_query(
        &self,
        _scope: &RequestScope,
        _path: Option<&str>,
        _params: &QueryParams,
    ) -> Result<Resource, RegistryError> {
        unsupported("execute query")
    }

    /// Serialize the subtree at `path` to `out`.
    fn dump(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        unsupported("dump")
    }

    /// Like [`dump`](Self::dump) but without resource content.
    fn dump_lite(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.dump(scope, path, out)
    }

    /// Deserialize a subtree produced by `dump` into `path`.
    fn restore(
        &self,
        _scope: &RequestScope,
        _path: &str,
        _input: &mut dyn Read,
    ) -> Result<(), RegistryError> {
        unsupported("restore")
    }
}
