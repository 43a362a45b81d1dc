//! Rename, move and copy.
//!
//! Three cases:
//! - the source is the mount point itself: the link node is relocated in the
//!   local repository and the mount re-created at the target;
//! - source and target both lie under the mount: the mounted registry does
//!   the work;
//! - the operation crosses the mount boundary: the subtree is dumped into a
//!   buffer and restored on the other side. The two registries are not
//!   updated atomically.

use std::sync::Arc;

use regmount_core::{single_path_map, Operation, PathMap, RegistryError, RequestContext};
use tracing::{debug, info};

use super::MountHandler;

impl MountHandler {
    pub(super) fn rename_resource(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<String>, RegistryError> {
        let (source, target) = endpoints(ctx)?;
        let target = sibling_of(&source, &target);
        match self.relocate_paths(ctx, Operation::Rename, &source, &target) {
            Ok(Some(renamed)) => {
                ctx.set_processing_complete(true);
                self.delegated(Operation::Rename);
                Ok(Some(renamed))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.failed(Operation::Rename);
                Err(RegistryError::delegate("Could not rename the remote resource.", e))
            }
        }
    }

    pub(super) fn relocate(
        &self,
        ctx: &mut RequestContext<'_>,
        op: Operation,
    ) -> Result<Option<String>, RegistryError> {
        let (source, target) = endpoints(ctx)?;
        match self.relocate_paths(ctx, op, &source, &target) {
            Ok(Some(relocated)) => {
                ctx.set_processing_complete(true);
                self.delegated(op);
                Ok(Some(relocated))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.failed(op);
                let verb = if op == Operation::Copy { "copy" } else { "move" };
                Err(RegistryError::delegate(
                    format!("Could not {verb} the remote resource {source}."),
                    e,
                ))
            }
        }
    }

    /// `None` when neither path belongs to this mount.
    fn relocate_paths(
        &self,
        ctx: &RequestContext<'_>,
        op: Operation,
        source: &str,
        target: &str,
    ) -> Result<Option<String>, RegistryError> {
        let source_inside = self.paths.contains(source);
        let target_inside = self.paths.contains(target);

        if self.paths.is_mount_root(source) {
            return self.relink(ctx, op, source, target).map(Some);
        }
        match (source_inside, target_inside) {
            (true, true) => self.relocate_within(ctx, op, source, target).map(Some),
            (true, false) => self.transfer_out(ctx, op, source, target).map(Some),
            (false, true) => self.transfer_in(ctx, op, source, target).map(Some),
            (false, false) => Ok(None),
        }
    }

    /// Move the mount itself. The mounted registry is never touched: a
    /// handler for the same mount is installed at the target, and unless
    /// this is a copy the old one is detached afterwards.
    fn relink(
        &self,
        ctx: &RequestContext<'_>,
        op: Operation,
        source: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        let chain = ctx.chain().ok_or_else(|| {
            RegistryError::configuration(format!(
                "Cannot relink the mount at {source}: no handler chain"
            ))
        })?;
        let scope = ctx.scope();
        let registry = ctx.registry();
        let relocated = match op {
            Operation::Rename => ctx.repository().rename(scope, source, target)?,
            Operation::Move => ctx.repository().move_resource(scope, source, target)?,
            _ => target.to_string(),
        };
        let handler = Arc::new(self.relocated(&relocated)?);
        registry.create_link(scope, &relocated, self.config().id())?;
        chain.add_handler(handler.phase(), Arc::new(handler.filter()), handler);
        if op != Operation::Copy {
            registry.remove_link(scope, source)?;
            self.detach(ctx);
        }
        info!(mount = %source, path = %relocated, %op, "mount relinked");
        Ok(relocated)
    }

    fn relocate_within(
        &self,
        ctx: &RequestContext<'_>,
        op: Operation,
        source: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        let scope = ctx.scope();
        let actual_source = self.paths.to_actual(source);
        let actual_target = self.paths.to_actual(target);
        let mut map = PathMap::new();
        map.insert(actual_source.clone(), source.to_string());
        map.insert(actual_target.clone(), target.to_string());

        let mounted = self.target(ctx)?;
        let _nested = mounted.nested(scope, map);
        let relocated = match op {
            Operation::Rename => mounted.store.rename(scope, &actual_source, &actual_target)?,
            Operation::Move => mounted.store.move_resource(scope, &actual_source, &actual_target)?,
            _ => mounted.store.copy(scope, &actual_source, &actual_target)?,
        };
        Ok(self.paths.to_full(&relocated))
    }

    /// From the mounted registry into the local namespace.
    fn transfer_out(
        &self,
        ctx: &RequestContext<'_>,
        op: Operation,
        source: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        let scope = ctx.scope();
        let actual_source = self.paths.to_actual(source);
        let mounted = self.target(ctx)?;

        let mut buffer = Vec::new();
        {
            let _nested = mounted.nested(scope, single_path_map(&actual_source, source));
            mounted.store.dump(scope, &actual_source, &mut buffer)?;
        }
        ctx.registry().restore(scope, target, &mut buffer.as_slice())?;
        if op != Operation::Copy {
            let _nested = mounted.nested(scope, single_path_map(&actual_source, source));
            mounted.store.delete(scope, &actual_source)?;
        }
        self.transferred(op, buffer.len() as u64);
        debug!(
            mount = %self.mount_point(),
            path = %source,
            %target,
            bytes = buffer.len(),
            "transferred out of mount"
        );
        Ok(target.to_string())
    }

    /// From the local namespace into the mounted registry.
    fn transfer_in(
        &self,
        ctx: &RequestContext<'_>,
        op: Operation,
        source: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        let scope = ctx.scope();
        let registry = ctx.registry();
        let actual_target = self.paths.to_actual(target);
        let mounted = self.target(ctx)?;

        let mut buffer = Vec::new();
        registry.dump(scope, source, &mut buffer)?;
        {
            let _nested = mounted.nested(scope, single_path_map(&actual_target, target));
            mounted.store.restore(scope, &actual_target, &mut buffer.as_slice())?;
        }
        if op != Operation::Copy {
            registry.delete(scope, source)?;
        }
        self.transferred(op, buffer.len() as u64);
        debug!(
            mount = %self.mount_point(),
            path = %source,
            %target,
            bytes = buffer.len(),
            "transferred into mount"
        );
        Ok(target.to_string())
    }
}

fn endpoints(ctx: &RequestContext<'_>) -> Result<(String, String), RegistryError> {
    let source = ctx
        .source_path
        .clone()
        .unwrap_or_else(|| ctx.resource_path.clone());
    let target = ctx
        .target_path
        .clone()
        .ok_or(RegistryError::MissingArgument("target path"))?;
    Ok((source, target))
}

/// Resolve a bare rename target against the source's parent.
fn sibling_of(source: &str, new_name: &str) -> String {
    if new_name.starts_with('/') {
        return new_name.to_string();
    }
    match source.rfind('/') {
        Some(0) | None => format!("/{new_name}"),
        Some(i) => format!("{}/{}", &source[..i], new_name),
    }
}
