//! `RequestContext`: the argument bag handed to every handler invocation.

use std::io::{Read, Write};

use crate::chain::HandlerChain;
use crate::scope::RequestScope;
use crate::store::RegistryStore;
use crate::types::{Comment, QueryParams, Resource};

/// One operation travelling through a handler chain.
///
/// `registry` is the handler-aware registry the operation entered through;
/// `repository` is the raw store underneath it. Handlers that need to write
/// back into the local namespace go through `registry`; handlers that must
/// bypass the chain (e.g. relocating a link node) use `repository`.
pub struct RequestContext<'a> {
    scope: &'a RequestScope,
    registry: &'a dyn RegistryStore,
    repository: &'a dyn RegistryStore,
    chain: Option<&'a dyn HandlerChain>,

    /// Path the operation addresses (complete path, including parameters).
    pub resource_path: String,
    /// Source of move/copy/rename/association operations.
    pub source_path: Option<String>,
    /// Target of move/copy/rename/association operations.
    pub target_path: Option<String>,
    /// Resource being put or imported, or the stored query for `execute_query`.
    pub resource: Option<Resource>,
    pub tag: Option<String>,
    pub comment: Option<Comment>,
    pub rating: Option<u8>,
    pub association_type: Option<String>,
    pub query_params: QueryParams,
    pub source_url: Option<String>,
    /// User whose rating `get_rating` asks for.
    pub user: Option<String>,

    dump_writer: Option<&'a mut dyn Write>,
    dump_reader: Option<&'a mut dyn Read>,
    /// Bytes a handler wrote to the dump writer.
    pub bytes_written: u64,
    /// Bytes a handler read from the restore reader.
    pub bytes_read: u64,

    processing_complete: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        scope: &'a RequestScope,
        registry: &'a dyn RegistryStore,
        repository: &'a dyn RegistryStore,
    ) -> Self {
        Self {
            scope,
            registry,
            repository,
            chain: None,
            resource_path: String::new(),
            source_path: None,
            target_path: None,
            resource: None,
            tag: None,
            comment: None,
            rating: None,
            association_type: None,
            query_params: QueryParams::new(),
            source_url: None,
            user: None,
            dump_writer: None,
            dump_reader: None,
            bytes_written: 0,
            bytes_read: 0,
            processing_complete: false,
        }
    }

    pub fn with_chain(mut self, chain: &'a dyn HandlerChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = path.into();
        self
    }

    /// Set source and target; the resource path becomes the source.
    pub fn with_source_and_target(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let source = source.into();
        self.resource_path = source.clone();
        self.source_path = Some(source);
        self.target_path = Some(target.into());
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_association_type(mut self, association_type: impl Into<String>) -> Self {
        self.association_type = Some(association_type.into());
        self
    }

    pub fn with_query_params(mut self, params: QueryParams) -> Self {
        self.query_params = params;
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_dump_writer(mut self, writer: &'a mut dyn Write) -> Self {
        self.dump_writer = Some(writer);
        self
    }

    pub fn with_dump_reader(mut self, reader: &'a mut dyn Read) -> Self {
        self.dump_reader = Some(reader);
        self
    }

    /// A fresh context for `path` sharing this context's scope, registries and chain.
    pub fn child(&self, path: impl Into<String>) -> RequestContext<'a> {
        let mut child = RequestContext::new(self.scope, self.registry, self.repository);
        child.chain = self.chain;
        child.resource_path = path.into();
        child
    }

    pub fn scope(&self) -> &'a RequestScope {
        self.scope
    }

    pub fn registry(&self) -> &'a dyn RegistryStore {
        self.registry
    }

    pub fn repository(&self) -> &'a dyn RegistryStore {
        self.repository
    }

    pub fn chain(&self) -> Option<&'a dyn HandlerChain> {
        self.chain
    }

    pub fn dump_writer(&mut self) -> Option<&mut (dyn Write + 'a)> {
        self.dump_writer.as_deref_mut()
    }

    pub fn dump_reader(&mut self) -> Option<&mut (dyn Read + 'a)> {
        self.dump_reader.as_deref_mut()
    }

    /// Hand the dump writer back to the caller (used when no handler consumed it).
    pub fn take_dump_writer(&mut self) -> Option<&'a mut dyn Write> {
        self.dump_writer.take()
    }

    pub fn take_dump_reader(&mut self) -> Option<&'a mut dyn Read> {
        self.dump_reader.take()
    }

    pub fn processing_complete(&self) -> bool {
        self.processing_complete
    }

    /// Signal the chain that no further handler (or the repository) needs to run.
    pub fn set_processing_complete(&mut self, complete: bool) {
        self.processing_complete = complete;
    }
}
