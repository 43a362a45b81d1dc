//! `MountHandler`: serves every operation under a mount point from the
//! mounted registry.
//!
//! Each intercepted call follows the same shape: enter the reentrancy guard
//! (falling back to pass-through on re-entry), translate the full path to the
//! actual path, resolve the endpoint, run the delegate call inside a nested
//! operation, translate the result back and mark processing complete.
//!
//! Failures are handled per operation:
//! - get, put, delete, rename, move, copy, dump and restore propagate.
//! - add/remove comment, apply/remove tag, rate, tag search and query wrap
//!   the cause and propagate.
//! - add/remove association and import log the failure and carry on.
//! - ratings, comments, tags and association lookups degrade to empty or
//!   zero results so a federated view survives an unreachable mount.
//! - existence checks log the failure and report `false`.

mod archive;
mod content;
mod metadata;
mod query;
mod relocate;

use std::sync::Arc;

use regmount_core::{
    Association, Comment, Handler, HandlerId, HandlerManager, HandlerPhase, Operation, PassThrough,
    PathPrefixFilter, RegistryError, RegistryStore, RequestContext, RequestScope, Resource, Tag,
    TaggedResourcePath,
};
use regmount_observability::MountMetrics;

use crate::config::MountConfig;
use crate::endpoint::{EndpointServices, MountEndpoint, MountTarget};
use crate::guard::ReentrancyGuard;
use crate::path::PathTranslator;

pub use query::QUERIED_MOUNTS_ATTRIBUTE;

/// The federated-operation handler for one mount.
pub struct MountHandler {
    id: HandlerId,
    paths: PathTranslator,
    endpoint: MountEndpoint,
    guard: ReentrancyGuard,
    phase: HandlerPhase,
    metrics: MountMetrics,
}

impl MountHandler {
    pub fn new(config: MountConfig, services: EndpointServices) -> Self {
        let id = HandlerId::next();
        Self {
            id,
            paths: PathTranslator::new(config.mount_point(), config.sub_path()),
            endpoint: MountEndpoint::new(config, services),
            guard: ReentrancyGuard::new(id),
            phase: HandlerPhase::Tenant,
            metrics: MountMetrics::global(),
        }
    }

    /// Phase the handler is (or will be) registered in.
    pub fn with_phase(mut self, phase: HandlerPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_metrics(mut self, metrics: MountMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// A handler serving the same mount from `mount_point`.
    pub fn relocated(&self, mount_point: &str) -> Result<Self, RegistryError> {
        let config = self.config().relocated(mount_point)?;
        let id = HandlerId::next();
        Ok(Self {
            id,
            paths: PathTranslator::new(config.mount_point(), config.sub_path()),
            endpoint: self.endpoint.relocated(config),
            guard: ReentrancyGuard::new(id),
            phase: self.phase,
            metrics: self.metrics.clone(),
        })
    }

    /// Register the handler with `manager`, filtered to its mount point.
    pub fn install(self, manager: &HandlerManager) -> Arc<Self> {
        let handler = Arc::new(self);
        manager.add_handler(handler.phase, Arc::new(handler.filter()), handler.clone());
        handler
    }

    /// Filter accepting operations at or below the mount point.
    pub fn filter(&self) -> PathPrefixFilter {
        PathPrefixFilter::new(self.paths.mount_point())
    }

    pub fn config(&self) -> &MountConfig {
        self.endpoint.config()
    }

    pub fn endpoint(&self) -> &MountEndpoint {
        &self.endpoint
    }

    pub fn paths(&self) -> &PathTranslator {
        &self.paths
    }

    pub fn phase(&self) -> HandlerPhase {
        self.phase
    }

    /// Existence check that also treats a resource carrying the
    /// link-restoration marker as absent. Failures report `false`.
    pub fn resource_exists_verified(
        &self,
        scope: &RequestScope,
        registry: &dyn RegistryStore,
        full_path: &str,
    ) -> bool {
        self.check_verified(scope, registry, full_path)
    }

    fn mount_point(&self) -> &str {
        self.paths.mount_point()
    }

    fn url(&self) -> &str {
        self.endpoint.config().display_url()
    }

    fn target(&self, ctx: &RequestContext<'_>) -> Result<MountTarget, RegistryError> {
        self.endpoint.resolve(ctx.scope(), ctx.registry())
    }

    /// Detach this handler from the chain the request came through.
    fn detach(&self, ctx: &RequestContext<'_>) {
        if let Some(chain) = ctx.chain() {
            chain.remove_handler(self.id, self.phase);
        }
    }

    fn delegated(&self, op: Operation) {
        self.metrics.record_delegated(self.mount_point(), op.as_str());
    }

    fn degraded(&self, op: Operation) {
        self.metrics.record_degraded(self.mount_point(), op.as_str());
    }

    fn failed(&self, op: Operation) {
        self.metrics.record_failed(self.mount_point(), op.as_str());
    }

    fn transferred(&self, op: Operation, bytes: u64) {
        self.metrics.record_transfer(self.mount_point(), op.as_str(), bytes);
    }
}

impl std::fmt::Debug for MountHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandler")
            .field("id", &self.id)
            .field("mount_point", &self.paths.mount_point())
            .field("sub_path", &self.paths.sub_path())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Handler for MountHandler {
    fn id(&self) -> HandlerId {
        self.id
    }

    fn name(&self) -> &str {
        "mount"
    }

    fn get(&self, ctx: &mut RequestContext<'_>) -> Result<Option<Resource>, RegistryError> {
        let Some(call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get(ctx);
        };
        self.get_resource(ctx, &call).map(Some)
    }

    fn put(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.put(ctx);
        };
        self.put_resource(ctx)
    }

    fn import_resource(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.import_resource(ctx);
        };
        self.import(ctx);
        Ok(())
    }

    fn delete(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.delete(ctx);
        };
        self.delete_resource(ctx)
    }

    fn rename(&self, ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.rename(ctx);
        };
        self.rename_resource(ctx)
    }

    fn move_resource(&self, ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.move_resource(ctx);
        };
        self.relocate(ctx, Operation::Move)
    }

    fn copy(&self, ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.copy(ctx);
        };
        self.relocate(ctx, Operation::Copy)
    }

    fn resource_exists(&self, ctx: &mut RequestContext<'_>) -> Result<bool, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.resource_exists(ctx);
        };
        Ok(self.exists(ctx))
    }

    fn add_association(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.add_association(ctx);
        };
        self.change_association(ctx, Operation::AddAssociation);
        Ok(())
    }

    fn remove_association(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.remove_association(ctx);
        };
        self.change_association(ctx, Operation::RemoveAssociation);
        Ok(())
    }

    fn get_all_associations(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<Association>>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_all_associations(ctx);
        };
        Ok(Some(self.associations(ctx, Operation::GetAllAssociations)))
    }

    fn get_associations(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<Association>>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_associations(ctx);
        };
        Ok(Some(self.associations(ctx, Operation::GetAssociations)))
    }

    fn apply_tag(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.apply_tag(ctx);
        };
        self.change_tag(ctx, Operation::ApplyTag)
    }

    fn remove_tag(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.remove_tag(ctx);
        };
        self.change_tag(ctx, Operation::RemoveTag)
    }

    fn get_tags(&self, ctx: &mut RequestContext<'_>) -> Result<Option<Vec<Tag>>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_tags(ctx);
        };
        Ok(Some(self.tags(ctx)))
    }

    fn get_resource_paths_with_tag(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<TaggedResourcePath>>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_resource_paths_with_tag(ctx);
        };
        self.tagged_paths(ctx).map(Some)
    }

    fn rate_resource(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.rate_resource(ctx);
        };
        self.rate(ctx)
    }

    fn get_rating(&self, ctx: &mut RequestContext<'_>) -> Result<Option<u8>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_rating(ctx);
        };
        Ok(Some(self.rating(ctx)))
    }

    fn get_average_rating(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<f32>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_average_rating(ctx);
        };
        Ok(Some(self.average_rating(ctx)))
    }

    fn add_comment(&self, ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.add_comment(ctx);
        };
        self.comment(ctx)
    }

    fn remove_comment(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.remove_comment(ctx);
        };
        self.uncomment(ctx)
    }

    fn get_comments(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<Comment>>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.get_comments(ctx);
        };
        Ok(Some(self.comments(ctx)))
    }

    fn execute_query(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Resource>, RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.execute_query(ctx);
        };
        self.query(ctx)
    }

    fn dump(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.dump(ctx);
        };
        self.dump_content(ctx, Operation::Dump)
    }

    fn dump_lite(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.dump_lite(ctx);
        };
        self.dump_content(ctx, Operation::DumpLite)
    }

    fn restore(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let Some(_call) = self.guard.enter(ctx.scope()) else {
            return PassThrough.restore(ctx);
        };
        self.restore_content(ctx)
    }
}
