//! `HandledRegistry`: a `RegistryStore` that routes every call through a
//! handler chain before falling back to the raw repository.

use std::io::{Read, Write};
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::trace;

use crate::chain::HandlerManager;
use crate::context::RequestContext;
use crate::error::RegistryError;
use crate::handler::Operation;
use crate::scope::RequestScope;
use crate::store::RegistryStore;
use crate::types::{Association, Comment, QueryParams, Resource, Tag, TaggedResourcePath};

/// The registry a request enters through.
///
/// For each call a [`RequestContext`] is built (with this registry as
/// `registry` and the wrapped store as `repository`) and dispatched to the
/// [`HandlerManager`]. If no handler marks processing complete the repository
/// serves the call. Queries and tag searches are federated: every matching
/// handler contributes, and the repository's own matches are merged in.
pub struct HandledRegistry {
    repository: Arc<dyn RegistryStore>,
    manager: Arc<HandlerManager>,
}

impl HandledRegistry {
    pub fn new(repository: Arc<dyn RegistryStore>, manager: Arc<HandlerManager>) -> Self {
        Self {
            repository,
            manager,
        }
    }

    pub fn manager(&self) -> &Arc<HandlerManager> {
        &self.manager
    }

    pub fn repository(&self) -> &Arc<dyn RegistryStore> {
        &self.repository
    }

    fn context<'a>(&'a self, scope: &'a RequestScope) -> RequestContext<'a> {
        RequestContext::new(scope, self, self.repository.as_ref()).with_chain(self.manager.as_ref())
    }
}

impl RegistryStore for HandledRegistry {
    fn get(&self, scope: &RequestScope, path: &str) -> Result<Resource, RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        match self.manager.dispatch(Operation::Get, &mut ctx, |h, c| h.get(c))? {
            Some(Some(resource)) => Ok(resource),
            Some(None) => Err(RegistryError::not_found(path)),
            None => self.repository.get(scope, path),
        }
    }

    fn put(
        &self,
        scope: &RequestScope,
        path: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_resource(resource);
        if self
            .manager
            .dispatch(Operation::Put, &mut ctx, |h, c| h.put(c))?
            .is_some()
        {
            return Ok(path.to_string());
        }
        let resource = ctx.resource.take().ok_or(RegistryError::MissingArgument("resource"))?;
        self.repository.put(scope, path, resource)
    }

    fn delete(&self, scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        if self
            .manager
            .dispatch(Operation::Delete, &mut ctx, |h, c| h.delete(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.delete(scope, path)
    }

    fn resource_exists(&self, scope: &RequestScope, path: &str) -> Result<bool, RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        match self
            .manager
            .dispatch(Operation::ResourceExists, &mut ctx, |h, c| h.resource_exists(c))?
        {
            Some(exists) => Ok(exists),
            None => self.repository.resource_exists(scope, path),
        }
    }

    fn rename(
        &self,
        scope: &RequestScope,
        path: &str,
        new_path: &str,
    ) -> Result<String, RegistryError> {
        let mut ctx = self.context(scope).with_source_and_target(path, new_path);
        match self.manager.dispatch(Operation::Rename, &mut ctx, |h, c| h.rename(c))? {
            Some(Some(renamed)) => Ok(renamed),
            Some(None) => Ok(new_path.to_string()),
            None => self.repository.rename(scope, path, new_path),
        }
    }

    fn move_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        let mut ctx = self.context(scope).with_source_and_target(path, target);
        match self
            .manager
            .dispatch(Operation::Move, &mut ctx, |h, c| h.move_resource(c))?
        {
            Some(moved) => Ok(moved.unwrap_or_else(|| target.to_string())),
            None => self.repository.move_resource(scope, path, target),
        }
    }

    fn copy(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        let mut ctx = self.context(scope).with_source_and_target(path, target);
        match self.manager.dispatch(Operation::Copy, &mut ctx, |h, c| h.copy(c))? {
            Some(copied) => Ok(copied.unwrap_or_else(|| target.to_string())),
            None => self.repository.copy(scope, path, target),
        }
    }

    fn import_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        source_url: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        let mut ctx = self
            .context(scope)
            .with_path(path)
            .with_source_url(source_url)
            .with_resource(resource);
        if self
            .manager
            .dispatch(Operation::Import, &mut ctx, |h, c| h.import_resource(c))?
            .is_some()
        {
            return Ok(path.to_string());
        }
        let resource = ctx.resource.take().ok_or(RegistryError::MissingArgument("resource"))?;
        self.repository.import_resource(scope, path, source_url, resource)
    }

    fn create_link(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_source_and_target(path, target);
        if self
            .manager
            .dispatch(Operation::CreateLink, &mut ctx, |h, c| h.create_link(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.create_link(scope, path, target)
    }

    fn remove_link(&self, scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        if self
            .manager
            .dispatch(Operation::RemoveLink, &mut ctx, |h, c| h.remove_link(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.remove_link(scope, path)
    }

    fn add_association(
        &self,
        scope: &RequestScope,
        source: &str,
        target: &str,
        association_type: &str,
    ) -> Result<(), RegistryError> {
        let mut ctx = self
            .context(scope)
            .with_source_and_target(source, target)
            .with_association_type(association_type);
        if self
            .manager
            .dispatch(Operation::AddAssociation, &mut ctx, |h, c| h.add_association(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.add_association(scope, source, target, association_type)
    }

    fn remove_association(
        &self,
        scope: &RequestScope,
        source: &str,
        target: &str,
        association_type: &str,
    ) -> Result<(), RegistryError> {
        let mut ctx = self
            .context(scope)
            .with_source_and_target(source, target)
            .with_association_type(association_type);
        if self
            .manager
            .dispatch(Operation::RemoveAssociation, &mut ctx, |h, c| h.remove_association(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.remove_association(scope, source, target, association_type)
    }

    fn get_all_associations(
        &self,
        scope: &RequestScope,
        path: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        match self
            .manager
            .dispatch(Operation::GetAllAssociations, &mut ctx, |h, c| h.get_all_associations(c))?
        {
            Some(found) => Ok(found.unwrap_or_default()),
            None => self.repository.get_all_associations(scope, path),
        }
    }

    fn get_associations(
        &self,
        scope: &RequestScope,
        path: &str,
        association_type: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        let mut ctx = self
            .context(scope)
            .with_path(path)
            .with_association_type(association_type);
        match self
            .manager
            .dispatch(Operation::GetAssociations, &mut ctx, |h, c| h.get_associations(c))?
        {
            Some(found) => Ok(found.unwrap_or_default()),
            None => self.repository.get_associations(scope, path, association_type),
        }
    }

    fn apply_tag(&self, scope: &RequestScope, path: &str, tag: &str) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_tag(tag);
        if self
            .manager
            .dispatch(Operation::ApplyTag, &mut ctx, |h, c| h.apply_tag(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.apply_tag(scope, path, tag)
    }

    fn remove_tag(&self, scope: &RequestScope, path: &str, tag: &str) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_tag(tag);
        if self
            .manager
            .dispatch(Operation::RemoveTag, &mut ctx, |h, c| h.remove_tag(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.remove_tag(scope, path, tag)
    }

    fn get_tags(&self, scope: &RequestScope, path: &str) -> Result<Vec<Tag>, RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        match self.manager.dispatch(Operation::GetTags, &mut ctx, |h, c| h.get_tags(c))? {
            Some(tags) => Ok(tags.unwrap_or_default()),
            None => self.repository.get_tags(scope, path),
        }
    }

    fn get_resource_paths_with_tag(
        &self,
        scope: &RequestScope,
        tag: &str,
    ) -> Result<Vec<TaggedResourcePath>, RegistryError> {
        let mut ctx = self.context(scope).with_tag(tag);
        let federated = self.manager.collect(Operation::GetResourcePathsWithTag, &mut ctx, |h, c| {
            h.get_resource_paths_with_tag(c)
        })?;

        let mut seen = IndexSet::new();
        let mut merged = Vec::new();
        let local = if ctx.processing_complete() {
            Vec::new()
        } else {
            self.repository.get_resource_paths_with_tag(scope, tag)?
        };
        for tagged in federated.into_iter().flatten().chain(local) {
            if seen.insert(tagged.resource_path.clone()) {
                merged.push(tagged);
            }
        }
        Ok(merged)
    }

    fn add_comment(
        &self,
        scope: &RequestScope,
        path: &str,
        comment: Comment,
    ) -> Result<String, RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_comment(comment);
        if let Some(added) = self
            .manager
            .dispatch(Operation::AddComment, &mut ctx, |h, c| h.add_comment(c))?
        {
            return added.ok_or(RegistryError::MissingArgument("comment path"));
        }
        let comment = ctx.comment.take().ok_or(RegistryError::MissingArgument("comment"))?;
        self.repository.add_comment(scope, path, comment)
    }

    fn remove_comment(
        &self,
        scope: &RequestScope,
        comment_path: &str,
    ) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(comment_path);
        if self
            .manager
            .dispatch(Operation::RemoveComment, &mut ctx, |h, c| h.remove_comment(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.remove_comment(scope, comment_path)
    }

    fn get_comments(
        &self,
        scope: &RequestScope,
        path: &str,
    ) -> Result<Vec<Comment>, RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        match self
            .manager
            .dispatch(Operation::GetComments, &mut ctx, |h, c| h.get_comments(c))?
        {
            Some(comments) => Ok(comments.unwrap_or_default()),
            None => self.repository.get_comments(scope, path),
        }
    }

    fn rate_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        rating: u8,
    ) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_rating(rating);
        if self
            .manager
            .dispatch(Operation::RateResource, &mut ctx, |h, c| h.rate_resource(c))?
            .is_some()
        {
            return Ok(());
        }
        self.repository.rate_resource(scope, path, rating)
    }

    fn get_rating(
        &self,
        scope: &RequestScope,
        path: &str,
        user: &str,
    ) -> Result<u8, RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_user(user);
        match self.manager.dispatch(Operation::GetRating, &mut ctx, |h, c| h.get_rating(c))? {
            Some(rating) => Ok(rating.unwrap_or(0)),
            None => self.repository.get_rating(scope, path, user),
        }
    }

    fn get_average_rating(&self, scope: &RequestScope, path: &str) -> Result<f32, RegistryError> {
        let mut ctx = self.context(scope).with_path(path);
        match self
            .manager
            .dispatch(Operation::GetAverageRating, &mut ctx, |h, c| h.get_average_rating(c))?
        {
            Some(rating) => Ok(rating.unwrap_or(0.0)),
            None => self.repository.get_average_rating(scope, path),
        }
    }

    fn execute_query(
        &self,
        scope: &RequestScope,
        path: Option<&str>,
        params: &QueryParams,
    ) -> Result<Resource, RegistryError> {
        let mut ctx = self.context(scope).with_query_params(params.clone());
        if let Some(path) = path {
            let query = self.get(scope, path)?;
            ctx = ctx.with_path(path).with_resource(query);
        }
        let federated = self
            .manager
            .collect(Operation::ExecuteQuery, &mut ctx, |h, c| h.execute_query(c))?;

        let mut children = IndexSet::new();
        for result in &federated {
            children.extend(result.children().iter().cloned());
        }
        if !ctx.processing_complete() {
            let local = self.repository.execute_query(scope, path, params)?;
            children.extend(local.children().iter().cloned());
        }
        trace!(
            mounts = federated.len(),
            matches = children.len(),
            "federated query merged"
        );
        Ok(Resource::collection(
            path.unwrap_or(crate::constants::ROOT_PATH),
            children.into_iter().collect(),
        ))
    }

    fn dump(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_dump_writer(out);
        if self
            .manager
            .dispatch(Operation::Dump, &mut ctx, |h, c| h.dump(c))?
            .is_some()
        {
            return Ok(());
        }
        let out = ctx
            .take_dump_writer()
            .ok_or(RegistryError::MissingArgument("dump writer"))?;
        self.repository.dump(scope, path, out)
    }

    fn dump_lite(
        &self,
        scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_dump_writer(out);
        if self
            .manager
            .dispatch(Operation::DumpLite, &mut ctx, |h, c| h.dump_lite(c))?
            .is_some()
        {
            return Ok(());
        }
        let out = ctx
            .take_dump_writer()
            .ok_or(RegistryError::MissingArgument("dump writer"))?;
        self.repository.dump_lite(scope, path, out)
    }

    fn restore(
        &self,
        scope: &RequestScope,
        path: &str,
        input: &mut dyn Read,
    ) -> Result<(), RegistryError> {
        let mut ctx = self.context(scope).with_path(path).with_dump_reader(input);
        if self
            .manager
            .dispatch(Operation::Restore, &mut ctx, |h, c| h.restore(c))?
            .is_some()
        {
            return Ok(());
        }
        let input = ctx
            .take_dump_reader()
            .ok_or(RegistryError::MissingArgument("restore reader"))?;
        self.repository.restore(scope, path, input)
    }
}
