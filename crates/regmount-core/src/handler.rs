//! Handler and filter traits.
//!
//! A handler intercepts registry operations that its filter accepts. Every
//! method has a pass-through default, so an implementation overrides only the
//! operations it cares about. A handler that fully serves an operation calls
//! [`RequestContext::set_processing_complete`]; otherwise the chain moves on
//! and, eventually, the raw repository serves it.

use crate::context::RequestContext;
use crate::error::RegistryError;
use crate::scope::HandlerId;
use crate::types::{Association, Comment, Resource, Tag, TaggedResourcePath};

/// Registry operations a handler can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Put,
    Import,
    Delete,
    Rename,
    Move,
    Copy,
    CreateLink,
    RemoveLink,
    ResourceExists,
    AddAssociation,
    RemoveAssociation,
    GetAllAssociations,
    GetAssociations,
    ApplyTag,
    RemoveTag,
    GetTags,
    GetResourcePathsWithTag,
    RateResource,
    GetRating,
    GetAverageRating,
    AddComment,
    RemoveComment,
    GetComments,
    ExecuteQuery,
    Dump,
    DumpLite,
    Restore,
}

impl Operation {
    /// Operations that are not addressed to a path and run against every handler.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::ExecuteQuery | Self::GetResourcePathsWithTag)
    }

    /// Operations that address both a source and a target path.
    pub fn has_target(&self) -> bool {
        matches!(self, Self::Move | Self::Copy | Self::Rename)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Import => "import",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::CreateLink => "create_link",
            Self::RemoveLink => "remove_link",
            Self::ResourceExists => "resource_exists",
            Self::AddAssociation => "add_association",
            Self::RemoveAssociation => "remove_association",
            Self::GetAllAssociations => "get_all_associations",
            Self::GetAssociations => "get_associations",
            Self::ApplyTag => "apply_tag",
            Self::RemoveTag => "remove_tag",
            Self::GetTags => "get_tags",
            Self::GetResourcePathsWithTag => "get_resource_paths_with_tag",
            Self::RateResource => "rate_resource",
            Self::GetRating => "get_rating",
            Self::GetAverageRating => "get_average_rating",
            Self::AddComment => "add_comment",
            Self::RemoveComment => "remove_comment",
            Self::GetComments => "get_comments",
            Self::ExecuteQuery => "execute_query",
            Self::Dump => "dump",
            Self::DumpLite => "dump_lite",
            Self::Restore => "restore",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registry operation interceptor.
///
/// # Thread Safety
/// Handlers are shared across requests as `Arc<dyn Handler>`; per-request
/// state belongs in the [`RequestScope`](crate::scope::RequestScope).
pub trait Handler: Send + Sync {
    /// Identity used for reentrancy tracking and chain removal.
    fn id(&self) -> HandlerId;

    fn name(&self) -> &str {
        "handler"
    }

    fn get(&self, _ctx: &mut RequestContext<'_>) -> Result<Option<Resource>, RegistryError> {
        Ok(None)
    }

    fn put(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn import_resource(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn delete(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn rename(&self, _ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }

    fn move_resource(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }

    fn copy(&self, _ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }

    fn create_link(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn remove_link(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn resource_exists(&self, _ctx: &mut RequestContext<'_>) -> Result<bool, RegistryError> {
        Ok(false)
    }

    fn add_association(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn remove_association(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn get_all_associations(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<Association>>, RegistryError> {
        Ok(None)
    }

    fn get_associations(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<Association>>, RegistryError> {
        Ok(None)
    }

    fn apply_tag(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn remove_tag(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn get_tags(&self, _ctx: &mut RequestContext<'_>) -> Result<Option<Vec<Tag>>, RegistryError> {
        Ok(None)
    }

    fn get_resource_paths_with_tag(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<TaggedResourcePath>>, RegistryError> {
        Ok(None)
    }

    fn rate_resource(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn get_rating(&self, _ctx: &mut RequestContext<'_>) -> Result<Option<u8>, RegistryError> {
        Ok(None)
    }

    fn get_average_rating(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<f32>, RegistryError> {
        Ok(None)
    }

    fn add_comment(&self, _ctx: &mut RequestContext<'_>) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }

    fn remove_comment(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn get_comments(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Vec<Comment>>, RegistryError> {
        Ok(None)
    }

    fn execute_query(
        &self,
        _ctx: &mut RequestContext<'_>,
    ) -> Result<Option<Resource>, RegistryError> {
        Ok(None)
    }

    fn dump(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn dump_lite(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }

    fn restore(&self, _ctx: &mut RequestContext<'_>) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// The base behaviour: every operation passes through untouched.
///
/// Handlers that detect re-entry delegate here instead of running their own
/// logic a second time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Handler for PassThrough {
    fn id(&self) -> HandlerId {
        HandlerId::pass_through()
    }

    fn name(&self) -> &str {
        "pass-through"
    }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Decides whether a handler sees an operation.
pub trait Filter: Send + Sync {
    fn matches(&self, op: Operation, ctx: &RequestContext<'_>) -> bool;
}

/// Accepts operations addressed at or below a path prefix.
///
/// Global operations (queries, tag searches) always match. Move, copy and
/// rename match when either the source or the target is inside the prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixFilter {
    prefix: String,
}

impl PathPrefixFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `true` if `path` is the prefix itself or a descendant of it.
    /// Path parameters (`;comments:1`, ...) do not affect containment.
    pub fn contains(&self, path: &str) -> bool {
        is_within(&self.prefix, path)
    }
}

/// `true` if `path` equals `root` or lies below it on a segment boundary.
pub fn is_within(root: &str, path: &str) -> bool {
    if root == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with(';'),
        None => false,
    }
}

impl Filter for PathPrefixFilter {
    fn matches(&self, op: Operation, ctx: &RequestContext<'_>) -> bool {
        if op.is_global() {
            return true;
        }
        if op.has_target() {
            let source = ctx.source_path.as_deref().unwrap_or(&ctx.resource_path);
            let target_inside = ctx
                .target_path
                .as_deref()
                .map(|t| self.contains(t))
                .unwrap_or(false);
            return self.contains(source) || target_inside;
        }
        let path = match op {
            Operation::AddAssociation | Operation::RemoveAssociation => {
                ctx.source_path.as_deref().unwrap_or(&ctx.resource_path)
            }
            _ => &ctx.resource_path,
        };
        self.contains(path)
    }
}

/// Accepts every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl Filter for MatchAll {
    fn matches(&self, _op: Operation, _ctx: &RequestContext<'_>) -> bool {
        true
    }
}
