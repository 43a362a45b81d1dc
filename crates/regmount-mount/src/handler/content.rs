//! Resource content: get, put, import, delete and existence checks.

use regmount_core::constants::{
    REGISTRY_AUTHOR, REGISTRY_LINK, REGISTRY_LINK_RESTORATION, REGISTRY_MOUNT,
    REGISTRY_NON_RECURSIVE, REGISTRY_REAL_PATH, REGISTRY_USER, REMOTE_MOUNT_OPERATION,
    WSDL_MEDIA_TYPE, XSD_MEDIA_TYPE,
};
use regmount_core::{
    single_path_map, Content, Operation, RegistryError, RegistryStore, RequestContext,
    RequestScope, Resource,
};
use tracing::{debug, error, trace};

use super::MountHandler;
use crate::guard::ActiveCall;

/// Properties that describe how a resource was served, never stored.
const PROVENANCE_PROPERTIES: [&str; 5] = [
    REGISTRY_LINK,
    REGISTRY_USER,
    REGISTRY_MOUNT,
    REGISTRY_AUTHOR,
    REGISTRY_REAL_PATH,
];

impl MountHandler {
    pub(super) fn get_resource(
        &self,
        ctx: &mut RequestContext<'_>,
        call: &ActiveCall<'_>,
    ) -> Result<Resource, RegistryError> {
        let full = ctx.resource_path.clone();
        let actual = self.paths.to_actual(&full);

        let resource = match self.fetch(ctx, call, &full, &actual) {
            Ok(resource) => resource,
            Err(e) if e.is_not_found() => {
                trace!(
                    mount = %self.mount_point(),
                    path = %full,
                    %actual,
                    "mounted resource not found"
                );
                return Err(RegistryError::not_found(full));
            }
            Err(e) => {
                self.failed(Operation::Get);
                return Err(RegistryError::not_found_caused_by(full, e));
            }
        };

        ctx.set_processing_complete(true);
        self.delegated(Operation::Get);
        Ok(resource)
    }

    fn fetch(
        &self,
        ctx: &RequestContext<'_>,
        call: &ActiveCall<'_>,
        full: &str,
        actual: &str,
    ) -> Result<Resource, RegistryError> {
        let scope = ctx.scope();
        let target = self.target(ctx)?;

        let exists = {
            let _nested = target.nested(scope, single_path_map(actual, full));
            target.store.resource_exists(scope, actual)?
        };
        if !exists {
            return Err(RegistryError::not_found(full));
        }
        let mut resource = {
            let _nested = target.nested(scope, single_path_map(actual, full));
            target.store.get(scope, actual)?
        };

        if resource.is_collection() {
            let registry = ctx.registry();
            let children: Vec<String> = resource
                .children()
                .iter()
                .map(|child| self.paths.to_full(child))
                .collect();
            // Each child check re-enters the chain, and this handler, once.
            let visible: Vec<String> = call.suspended(|| {
                children
                    .into_iter()
                    .filter(|child| registry.resource_exists(scope, child).unwrap_or(false))
                    .collect()
            });
            resource.content = Content::Children(visible);
        }

        self.mark_provenance(scope, &mut resource, full, actual);
        Ok(resource)
    }

    fn mark_provenance(
        &self,
        scope: &RequestScope,
        resource: &mut Resource,
        full: &str,
        actual: &str,
    ) {
        let config = self.config();
        resource.path = full.to_string();
        if let Some(author) = config.author() {
            resource.author = Some(author.to_string());
        }
        resource.user_name = Some(scope.user());
        resource.tenant_id = scope.caller_tenant_id();

        resource.set_property(REGISTRY_LINK, "true");
        resource.set_property(REGISTRY_MOUNT, "true");
        if let Some(author) = config.author() {
            resource.set_property(REGISTRY_AUTHOR, author);
        }
        let user = match config.user_name() {
            Some(user) if config.remote() => user.to_string(),
            _ => scope.user(),
        };
        resource.set_property(REGISTRY_USER, user);
        let real_path = match config.connection_url() {
            Some(url) => format!("{url}/resourceContent?path={actual}"),
            None => actual.to_string(),
        };
        resource.set_property(REGISTRY_REAL_PATH, real_path);
        resource.remove_property(REGISTRY_NON_RECURSIVE);
        resource.remove_property(REGISTRY_LINK_RESTORATION);
    }

    pub(super) fn put_resource(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let full = ctx.resource_path.clone();
        let actual = self.paths.to_actual(&full);
        let mut resource = ctx
            .resource
            .take()
            .ok_or(RegistryError::MissingArgument("resource"))?;

        for property in PROVENANCE_PROPERTIES {
            resource.remove_property(property);
        }
        let schema_like = matches!(
            resource.media_type.as_deref(),
            Some(XSD_MEDIA_TYPE) | Some(WSDL_MEDIA_TYPE)
        );
        if self.config().remote() && schema_like {
            resource.set_property(REMOTE_MOUNT_OPERATION, "true");
        }
        resource.path = actual.clone();

        let result = self.target(ctx).and_then(|target| {
            let scope = ctx.scope();
            let _nested = target.nested(scope, single_path_map(&actual, &full));
            target.store.put(scope, &actual, resource)
        });
        if let Err(e) = result {
            self.failed(Operation::Put);
            return Err(RegistryError::delegate(format!("Unable to put resource {e}"), e));
        }
        ctx.set_processing_complete(true);
        self.delegated(Operation::Put);
        Ok(())
    }

    /// Failures are logged; the import is reported as served either way.
    pub(super) fn import(&self, ctx: &mut RequestContext<'_>) {
        let full = ctx.resource_path.clone();
        let actual = self.paths.to_actual(&full);
        let source_url = ctx.source_url.clone().unwrap_or_default();

        let result = ctx
            .resource
            .take()
            .ok_or(RegistryError::MissingArgument("resource"))
            .and_then(|resource| {
                let target = self.target(ctx)?;
                let scope = ctx.scope();
                let _nested = target.nested(scope, single_path_map(&actual, &full));
                target.store.import_resource(scope, &actual, &source_url, resource)
            });
        match result {
            Ok(_) => self.delegated(Operation::Import),
            Err(e) => {
                self.failed(Operation::Import);
                error!(
                    mount = %self.mount_point(),
                    path = %full,
                    url = %source_url,
                    error = %e,
                    "Could not import resource from {source_url}"
                );
            }
        }
        ctx.set_processing_complete(true);
    }

    pub(super) fn delete_resource(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<(), RegistryError> {
        let full = ctx.resource_path.clone();
        let scope = ctx.scope();

        let result = if self.paths.is_mount_root(&full) {
            ctx.registry().remove_link(scope, &full).map(|()| {
                self.detach(ctx);
                debug!(mount = %self.mount_point(), "mount removed");
            })
        } else {
            let actual = self.paths.to_actual(&full);
            self.target(ctx).and_then(|target| {
                let _nested = target.nested(scope, single_path_map(&actual, &full));
                target.store.delete(scope, &actual)
            })
        };
        if let Err(e) = result {
            self.failed(Operation::Delete);
            return Err(RegistryError::delegate(
                format!("Could not delete the remote resource. {e}"),
                e,
            ));
        }
        ctx.set_processing_complete(true);
        self.delegated(Operation::Delete);
        Ok(())
    }

    /// Failures are logged and reported as absent.
    pub(super) fn exists(&self, ctx: &mut RequestContext<'_>) -> bool {
        let full = ctx.resource_path.clone();
        let actual = self.paths.to_actual(&full);
        let result = self.target(ctx).and_then(|target| {
            let scope = ctx.scope();
            let _nested = target.nested(scope, single_path_map(&actual, &full));
            target.store.resource_exists(scope, &actual)
        });
        ctx.set_processing_complete(true);
        match result {
            Ok(exists) => exists,
            Err(e) => {
                self.failed(Operation::ResourceExists);
                error!(
                    mount = %self.mount_point(),
                    path = %full,
                    %actual,
                    url = %self.url(),
                    error = %e,
                    "Could not check the existence of the remote resource"
                );
                false
            }
        }
    }

    pub(super) fn check_verified(
        &self,
        scope: &RequestScope,
        registry: &dyn RegistryStore,
        full: &str,
    ) -> bool {
        let actual = self.paths.to_actual(full);
        let result = self.endpoint.resolve(scope, registry).and_then(|target| {
            let _nested = target.nested(scope, single_path_map(&actual, full));
            if !target.store.resource_exists(scope, &actual)? {
                return Ok(false);
            }
            let resource = target.store.get(scope, &actual)?;
            Ok(resource.property(REGISTRY_LINK_RESTORATION).is_none())
        });
        result.unwrap_or_else(|e| {
            error!(
                mount = %self.mount_point(),
                path = %full,
                %actual,
                error = %e,
                "Could not verify the existence of the remote resource"
            );
            false
        })
    }
}
