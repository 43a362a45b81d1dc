//! Comments, tags, ratings and associations.

use regmount_core::{
    single_path_map, Association, Comment, Operation, PathMap, RegistryError, RequestContext, Tag,
};
use tracing::{debug, error, warn};

use super::MountHandler;
use crate::endpoint::MountTarget;

impl MountHandler {
    /// Run `call` against the mounted registry inside a nested operation
    /// scoped to the request path.
    fn on_path<T>(
        &self,
        ctx: &RequestContext<'_>,
        call: impl FnOnce(&MountTarget, &str) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let full = &ctx.resource_path;
        let actual = self.paths.to_actual(full);
        let target = self.target(ctx)?;
        let _nested = target.nested(ctx.scope(), single_path_map(&actual, full.as_str()));
        call(&target, &actual)
    }

    /// Log a failed lookup and count it as degraded.
    fn degrade(&self, op: Operation, ctx: &RequestContext<'_>, what: &str, e: &RegistryError) {
        self.degraded(op);
        warn!(
            mount = %self.mount_point(),
            path = %ctx.resource_path,
            url = %self.url(),
            %op,
            "Could not get {what} from {}",
            self.url()
        );
        debug!(mount = %self.mount_point(), error = %e, "cause of degraded {op}");
    }

    // ── comments ──

    pub(super) fn comment(
        &self,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Option<String>, RegistryError> {
        let result = ctx
            .comment
            .take()
            .ok_or(RegistryError::MissingArgument("comment"))
            .and_then(|comment| {
                self.on_path(ctx, |target, actual| {
                    target.store.add_comment(ctx.scope(), actual, comment)
                })
            });
        match result {
            Ok(comment_path) => {
                ctx.set_processing_complete(true);
                self.delegated(Operation::AddComment);
                Ok(Some(self.paths.to_full(&comment_path)))
            }
            Err(e) => {
                self.failed(Operation::AddComment);
                Err(RegistryError::delegate(
                    format!("Could not add comment to the resource in {}", self.url()),
                    e,
                ))
            }
        }
    }

    pub(super) fn uncomment(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let result = self.on_path(ctx, |target, actual| {
            target.store.remove_comment(ctx.scope(), actual)
        });
        if let Err(e) = result {
            self.failed(Operation::RemoveComment);
            return Err(RegistryError::delegate(
                "Could not remove comment from the remote resource.",
                e,
            ));
        }
        ctx.set_processing_complete(true);
        self.delegated(Operation::RemoveComment);
        Ok(())
    }

    pub(super) fn comments(&self, ctx: &mut RequestContext<'_>) -> Vec<Comment> {
        let result = self.on_path(ctx, |target, actual| {
            target.store.get_comments(ctx.scope(), actual)
        });
        ctx.set_processing_complete(true);
        match result {
            Ok(comments) => {
                self.delegated(Operation::GetComments);
                comments
                    .into_iter()
                    .map(|mut comment| {
                        comment.path = comment.path.map(|p| self.paths.to_full(&p));
                        comment
                    })
                    .collect()
            }
            Err(e) => {
                self.degrade(Operation::GetComments, ctx, "comments", &e);
                Vec::new()
            }
        }
    }

    // ── tags ──

    pub(super) fn change_tag(
        &self,
        ctx: &mut RequestContext<'_>,
        op: Operation,
    ) -> Result<(), RegistryError> {
        let result = ctx
            .tag
            .clone()
            .ok_or(RegistryError::MissingArgument("tag"))
            .and_then(|tag| {
                self.on_path(ctx, |target, actual| {
                    if op == Operation::RemoveTag {
                        target.store.remove_tag(ctx.scope(), actual, &tag)
                    } else {
                        target.store.apply_tag(ctx.scope(), actual, &tag)
                    }
                })
            });
        if let Err(e) = result {
            self.failed(op);
            let message = if op == Operation::RemoveTag {
                "Could not remove tag from the remote resource.".to_string()
            } else {
                format!("Could not apply tag to the resource in {}", self.url())
            };
            return Err(RegistryError::delegate(message, e));
        }
        ctx.set_processing_complete(true);
        self.delegated(op);
        Ok(())
    }

    pub(super) fn tags(&self, ctx: &mut RequestContext<'_>) -> Vec<Tag> {
        let result = self.on_path(ctx, |target, actual| target.store.get_tags(ctx.scope(), actual));
        ctx.set_processing_complete(true);
        match result {
            Ok(tags) => {
                self.delegated(Operation::GetTags);
                tags
            }
            Err(e) => {
                self.degrade(Operation::GetTags, ctx, "tags", &e);
                Vec::new()
            }
        }
    }

    // ── ratings ──

    /// Remote mounts rate as the configured user.
    pub(super) fn rate(&self, ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        let config = self.config();
        let scope = ctx.scope();
        let result = ctx
            .rating
            .ok_or(RegistryError::MissingArgument("rating"))
            .and_then(|rating| {
                self.on_path(ctx, |target, actual| match config.user_name() {
                    Some(user) if config.remote() => scope.as_user(user, scope.tenant_id(), || {
                        target.store.rate_resource(scope, actual, rating)
                    }),
                    _ => target.store.rate_resource(scope, actual, rating),
                })
            });
        if let Err(e) = result {
            self.failed(Operation::RateResource);
            return Err(RegistryError::delegate("Unable to rate resource", e));
        }
        ctx.set_processing_complete(true);
        self.delegated(Operation::RateResource);
        Ok(())
    }

    /// Remote mounts report the configured user's rating.
    pub(super) fn rating(&self, ctx: &mut RequestContext<'_>) -> u8 {
        let config = self.config();
        let user = match config.user_name() {
            Some(user) if config.remote() => Some(user.to_string()),
            _ => ctx.user.clone(),
        };
        let result = user
            .ok_or(RegistryError::MissingArgument("user"))
            .and_then(|user| {
                self.on_path(ctx, |target, actual| {
                    target.store.get_rating(ctx.scope(), actual, &user)
                })
            });
        ctx.set_processing_complete(true);
        match result {
            Ok(rating) => {
                self.delegated(Operation::GetRating);
                rating
            }
            Err(e) => {
                self.degrade(Operation::GetRating, ctx, "ratings", &e);
                0
            }
        }
    }

    pub(super) fn average_rating(&self, ctx: &mut RequestContext<'_>) -> f32 {
        let result = self.on_path(ctx, |target, actual| {
            target.store.get_average_rating(ctx.scope(), actual)
        });
        ctx.set_processing_complete(true);
        match result {
            Ok(rating) => {
                self.delegated(Operation::GetAverageRating);
                rating
            }
            Err(e) => {
                self.degrade(Operation::GetAverageRating, ctx, "average ratings", &e);
                0.0
            }
        }
    }

    // ── associations ──

    /// Failures are logged; the change is reported as served either way.
    pub(super) fn change_association(&self, ctx: &mut RequestContext<'_>, op: Operation) {
        let result = self.update_association(ctx, op);
        ctx.set_processing_complete(true);
        match result {
            Ok(()) => self.delegated(op),
            Err(e) => {
                self.failed(op);
                let verb = if op == Operation::RemoveAssociation { "remove" } else { "add" };
                error!(
                    mount = %self.mount_point(),
                    path = %ctx.resource_path,
                    url = %self.url(),
                    error = %e,
                    "Could not {verb} associations for {}",
                    self.url()
                );
            }
        }
    }

    fn update_association(
        &self,
        ctx: &RequestContext<'_>,
        op: Operation,
    ) -> Result<(), RegistryError> {
        let scope = ctx.scope();
        let source = ctx
            .source_path
            .clone()
            .unwrap_or_else(|| ctx.resource_path.clone());
        let destination = ctx
            .target_path
            .clone()
            .ok_or(RegistryError::MissingArgument("association target"))?;
        let association_type = ctx
            .association_type
            .clone()
            .ok_or(RegistryError::MissingArgument("association type"))?;

        let actual_source = self.paths.to_actual(&source);
        let actual_destination = if self.paths.contains(&destination) {
            self.paths.to_actual(&destination)
        } else {
            destination.clone()
        };
        let mut map = PathMap::new();
        map.insert(actual_source.clone(), source);
        map.insert(actual_destination.clone(), destination);

        let target = self.target(ctx)?;
        let _nested = target.nested(scope, map);
        if op == Operation::RemoveAssociation {
            target
                .store
                .remove_association(scope, &actual_source, &actual_destination, &association_type)
        } else {
            target
                .store
                .add_association(scope, &actual_source, &actual_destination, &association_type)
        }
    }

    pub(super) fn associations(
        &self,
        ctx: &mut RequestContext<'_>,
        op: Operation,
    ) -> Vec<Association> {
        let association_type = ctx.association_type.clone();
        let result = self.on_path(ctx, |target, actual| match &association_type {
            Some(kind) if op == Operation::GetAssociations => {
                target.store.get_associations(ctx.scope(), actual, kind)
            }
            _ => target.store.get_all_associations(ctx.scope(), actual),
        });
        ctx.set_processing_complete(true);
        match result {
            Ok(associations) => {
                self.delegated(op);
                associations
                    .into_iter()
                    .map(|a| self.paths.association_to_full(a))
                    .collect()
            }
            Err(e) => {
                self.degrade(op, ctx, "associations", &e);
                Vec::new()
            }
        }
    }
}
