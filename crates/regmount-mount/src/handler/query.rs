//! Federated operations: queries and tag searches.
//!
//! Neither marks processing complete; every mount contributes its matches
//! and the enclosing registry merges them.

use regmount_core::constants::{RESULT_TYPE_PROPERTY, ROOT_PATH};
use regmount_core::{
    Operation, PathMap, QueryParams, RegistryError, RequestContext, Resource, TaggedResourcePath,
};
use tracing::trace;

use super::MountHandler;

/// Request attribute listing the mounts a federated query already reached.
pub const QUERIED_MOUNTS_ATTRIBUTE: &str = "execute.query.conn.key";

impl MountHandler {
    pub(super) fn query(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Resource>, RegistryError> {
        let scope = ctx.scope();
        let key = self.config().query_key();
        let mut queried = scope.attribute(QUERIED_MOUNTS_ATTRIBUTE).unwrap_or_default();
        if queried.contains(&key) {
            trace!(mount = %self.mount_point(), "mount already queried in this request");
            return Ok(None);
        }
        queried.push(key);
        scope.set_attribute(QUERIED_MOUNTS_ATTRIBUTE, queried);

        let params = self.query_params(ctx);
        let result = self.target(ctx).and_then(|target| {
            let _nested = target.nested(scope, PathMap::new());
            target.store.execute_query(scope, None, &params)
        });
        let matches = match result {
            Ok(matches) => matches,
            Err(e) => {
                self.failed(Operation::ExecuteQuery);
                return Err(RegistryError::delegate(
                    format!("Could not execute query in remote mount at {}", self.url()),
                    e,
                ));
            }
        };
        self.delegated(Operation::ExecuteQuery);

        let children = matches
            .children()
            .iter()
            .map(|child| self.paths.to_full_if_under(child))
            .collect();
        let path = if ctx.resource_path.is_empty() {
            ROOT_PATH
        } else {
            ctx.resource_path.as_str()
        };
        Ok(Some(Resource::collection(path, children)))
    }

    /// Caller parameters plus the stored query's text and result type.
    fn query_params(&self, ctx: &RequestContext<'_>) -> QueryParams {
        let mut params = ctx.query_params.clone();
        if let Some(query) = &ctx.resource {
            let text = String::from_utf8_lossy(query.bytes());
            if !text.is_empty() {
                params.insert("query".to_string(), text.into_owned());
            }
            if let Some(result_type) = query.property(RESULT_TYPE_PROPERTY) {
                params.insert(RESULT_TYPE_PROPERTY.to_string(), result_type.to_string());
            }
        }
        params.insert("remote".to_string(), "true".to_string());
        params
    }

    pub(super) fn tagged_paths(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Vec<TaggedResourcePath>, RegistryError> {
        let scope = ctx.scope();
        let result = ctx
            .tag
            .clone()
            .ok_or(RegistryError::MissingArgument("tag"))
            .and_then(|tag| {
                let target = self.target(ctx)?;
                let _nested = target.nested(scope, PathMap::new());
                target.store.get_resource_paths_with_tag(scope, &tag)
            });
        match result {
            Ok(tagged) => {
                self.delegated(Operation::GetResourcePathsWithTag);
                Ok(tagged
                    .into_iter()
                    .map(|t| TaggedResourcePath {
                        resource_path: self.paths.to_full_if_under(&t.resource_path),
                        tag_count: t.tag_count,
                    })
                    .collect())
            }
            Err(e) => {
                self.failed(Operation::GetResourcePathsWithTag);
                Err(RegistryError::delegate(
                    format!("Could not get resource paths with tag in {}", self.url()),
                    e,
                ))
            }
        }
    }
}
