//! `UserScopedStore`: a registry bound to one user and tenant.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::RegistryError;
use crate::scope::RequestScope;
use crate::store::RegistryStore;
use crate::types::{Association, Comment, QueryParams, Resource, Tag, TaggedResourcePath, TenantId};

/// Runs every call against `inner` with the session identity replaced by a
/// fixed user and tenant. The caller's identity is restored when the call
/// returns.
pub struct UserScopedStore {
    inner: Arc<dyn RegistryStore>,
    user: String,
    tenant_id: TenantId,
}

impl UserScopedStore {
    pub fn new(
        inner: Arc<dyn RegistryStore>,
        user: impl Into<String>,
        tenant_id: TenantId,
    ) -> Self {
        Self {
            inner,
            user: user.into(),
            tenant_id,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn inner(&self) -> &Arc<dyn RegistryStore> {
        &self.inner
    }

    fn scoped<T>(&self, scope: &RequestScope, f: impl FnOnce(&dyn RegistryStore) -> T) -> T {
        scope.as_user(&self.user, self.tenant_id, || f(self.inner.as_ref()))
    }
}

impl RegistryStore for UserScopedStore {
    fn get(&self, scope: &RequestScope, path: &str) -> Result<Resource, RegistryError> {
        self.scoped(scope, |s| s.get(scope, path))
    }

    fn put(
        &self,
        scope: &RequestScope,
        path: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        self.scoped(scope, |s| s.put(scope, path, resource))
    }

    fn delete(&self, scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.delete(scope, path))
    }

    fn resource_exists(&self, scope: &RequestScope, path: &str) -> Result<bool, RegistryError> {
        self.scoped(scope, |s| s.resource_exists(scope, path))
    }

    fn rename(
        &self,
        scope: &RequestScope,
        path: &str,
        new_path: &str,
    ) -> Result<String, RegistryError> {
        self.scoped(scope, |s| s.rename(scope, path, new_path))
    }

    fn move_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        self.scoped(scope, |s| s.move_resource(scope, path, target))
    }

    fn copy(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        self.scoped(scope, |s| s.copy(scope, path, target))
    }

    fn import_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        source_url: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        self.scoped(scope, |s| s.import_resource(scope, path, source_url, resource))
    }

    fn create_link(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.create_link(scope, path, target))
    }

    fn remove_link(&self, scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.remove_link(scope, path))
    }

    fn add_association(
        &self,
        scope: &RequestScope,
        source: &str,
        target: &str,
        association_type: &str,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.add_association(scope, source, target, association_type))
    }

    fn remove_association(
        &self,
        scope: &RequestScope,
        source: &str,
        target: &str,
        association_type: &str,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.remove_association(scope, source, target, association_type))
    }

    fn get_all_associations(
        &self,
        scope: &RequestScope,
        path: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        self.scoped(scope, |s| s.get_all_associations(scope, path))
    }

    fn get_associations(
        &self,
        scope: &RequestScope,
        path: &str,
        association_type: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        self.scoped(scope, |s| s.get_associations(scope, path, association_type))
    }

    fn apply_tag(&self, scope: &RequestScope, path: &str, tag: &str) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.apply_tag(scope, path, tag))
    }

    fn remove_tag(&self, scope: &RequestScope, path: &str, tag: &str) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.remove_tag(scope, path, tag))
    }

    fn get_tags(&self, scope: &RequestScope, path: &str) -> Result<Vec<Tag>, RegistryError> {
        self.scoped(scope, |s| s.get_tags(scope, path))
    }

    fn get_resource_paths_with_tag(
        &self,
        scope: &RequestScope,
        tag: &str,
    ) -> Result<Vec<TaggedResourcePath>, RegistryError> {
        self.scoped(scope, |s| s.get_resource_paths_with_tag(scope, tag))
    }

    fn add_comment(
        &self,
        scope: &RequestScope,
        path: &str,
        comment: Comment,
    ) -> Result<String, RegistryError> {
        self.scoped(scope, |s| s.add_comment(scope, path, comment))
    }

    fn remove_comment(
        &self,
        scope: &RequestScope,
        comment_path: &str,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.remove_comment(scope, comment_path))
    }

    fn get_comments(
        &self,
        scope: &RequestScope,
        path: &str,
    ) -> Result<Vec<Comment>, RegistryError> {
        self.scoped(scope, |s| s.get_comments(scope, path))
    }

    fn rate_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        rating: u8,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.rate_resource(scope, path, rating))
    }

    fn get_rating(
        &self,
        scope: &RequestScope,
        path: &str,
        user: &str,
    ) -> Result<u8, RegistryError> {
        self.scoped(scope, |s| s.get_rating(scope, path, user))
    }

    fn get_average_rating(&self, scope: &RequestScope, path: &str) -> Result<f32, RegistryError> {
        self.scoped(scope, |s| s.get_average_rating(scope, path))
    }

    fn execute_query(
        &self,
        scope: &RequestScope,
        path: Option<&str>,
        params: &QueryParams,
    ) -> Result<Resource, RegistryError> {
        self.scoped(scope, |s| s.execute_query(scope, path, params))
    }

    fn dump(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.dump(scope, path, out))
    }

    fn dump_lite(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.dump_lite(scope, path, out))
    }

    fn restore(
        &self,
        scope: &RequestScope,
        path: &str,
        input: &mut dyn Read,
    ) -> Result<(), RegistryError> {
        self.scoped(scope, |s| s.restore(scope, path, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Session;

    struct WhoAmI;

    impl RegistryStore for WhoAmI {
        fn get(&self, scope: &RequestScope, path: &str) -> Result<Resource, RegistryError> {
            let mut r = Resource::new(path);
            r.user_name = Some(scope.user());
            r.tenant_id = scope.tenant_id();
            Ok(r)
        }
        fn put(&self, _: &RequestScope, path: &str, _: Resource) -> Result<String, RegistryError> {
            Ok(path.to_string())
        }
        fn delete(&self, _: &RequestScope, _: &str) -> Result<(), RegistryError> {
            Ok(())
        }
        fn resource_exists(&self, _: &RequestScope, _: &str) -> Result<bool, RegistryError> {
            Ok(true)
        }
    }

    #[test]
    fn calls_run_as_bound_user_and_restore_caller() {
        let store = UserScopedStore::new(Arc::new(WhoAmI), "bob", 42);
        let scope = RequestScope::new(Session::new("alice", 1));
        let r = store.get(&scope, "/x").unwrap();
        assert_eq!(r.user_name.as_deref(), Some("bob"));
        assert_eq!(r.tenant_id, 42);
        assert_eq!(scope.user(), "alice");
        assert_eq!(scope.tenant_id(), 1);
    }

    #[test]
    fn unsupported_operations_pass_through_the_error() {
        let store = UserScopedStore::new(Arc::new(WhoAmI), "bob", 42);
        let scope = RequestScope::default();
        let err = store.get_tags(&scope, "/x").unwrap_err();
        assert!(matches!(err, RegistryError::Unsupported { .. }));
    }
}
