//! In-memory `RegistryStore` implementation.
//!
//! Suitable for testing, CLI use, and as the embedded registry behind local
//! mounts. Thread-safe via `Arc<RwLock<Inner>>`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, RwLock};

use regmount_core::constants::{
    REGISTRY_LINK, REGISTRY_MOUNT_POINT, REGISTRY_TARGET_POINT, ROOT_PATH,
};
use regmount_core::{
    is_within, Association, Comment, Content, QueryParams, RegistryError, RegistryStore,
    RequestScope, Resource, Tag, TaggedResourcePath,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Format version written into dump archives.
pub const DUMP_VERSION: u32 = 1;

/// Property recording where an imported resource came from.
pub const SOURCE_URL_PROPERTY: &str = "registry.import.source";

const COMMENT_PARAM: &str = ";comments:";

// ─── Path helpers ────────────────────────────────────────────────────────────

/// Strip path parameters and trailing separators. Paths must be absolute.
fn normalize(path: &str) -> Result<String, RegistryError> {
    let base = path.split(';').next().unwrap_or(path);
    if !base.starts_with('/') {
        return Err(RegistryError::InvalidPath {
            path: path.to_string(),
            reason: "path must be absolute".into(),
        });
    }
    let trimmed = base.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else {
        trimmed.to_string()
    })
}

fn parent_of(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_PATH),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `key` relative to `root`: empty for the root itself, otherwise starting with `/`.
fn relative<'k>(root: &str, key: &'k str) -> &'k str {
    if key == root {
        ""
    } else if root == ROOT_PATH {
        key
    } else {
        &key[root.len()..]
    }
}

fn join(root: &str, relative: &str) -> String {
    if relative.is_empty() {
        root.to_string()
    } else if root == ROOT_PATH {
        relative.to_string()
    } else {
        format!("{root}{relative}")
    }
}

fn rebase(key: &str, from: &str, to: &str) -> String {
    join(to, relative(from, key))
}

// ─── Dump archive ────────────────────────────────────────────────────────────

/// Serialized subtree produced by `dump` and consumed by `restore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpArchive {
    pub version: u32,
    pub entries: Vec<DumpEntry>,
}

/// One resource in a dump, addressed relative to the dumped root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpEntry {
    /// Empty for the dumped root, otherwise `/`-prefixed.
    pub path: String,
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ratings: BTreeMap<String, u8>,
}

// ─── Inner state ─────────────────────────────────────────────────────────────

struct Inner {
    /// Path → resource. Collections are stored with empty children; children
    /// are derived from the key set on read.
    resources: BTreeMap<String, Resource>,
    /// Path → tag → users that applied it.
    tags: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    comments: BTreeMap<String, Vec<Comment>>,
    /// Path → user → rating.
    ratings: BTreeMap<String, BTreeMap<String, u8>>,
    associations: Vec<Association>,
    next_comment_id: u64,
}

impl Inner {
    fn new() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(
            ROOT_PATH.to_string(),
            Resource::collection(ROOT_PATH, Vec::new()),
        );
        Self {
            resources,
            tags: BTreeMap::new(),
            comments: BTreeMap::new(),
            ratings: BTreeMap::new(),
            associations: Vec::new(),
            next_comment_id: 1,
        }
    }

    fn require(&self, path: &str) -> Result<&Resource, RegistryError> {
        self.resources
            .get(path)
            .ok_or_else(|| RegistryError::not_found(path))
    }

    fn children_of(&self, path: &str) -> Vec<String> {
        self.resources
            .keys()
            .filter(|k| parent_of(k) == Some(path))
            .cloned()
            .collect()
    }

    fn subtree(&self, root: &str) -> Vec<String> {
        self.resources
            .keys()
            .filter(|k| is_within(root, k))
            .cloned()
            .collect()
    }

    /// Read a resource, filling in the children of collections.
    fn read(&self, path: &str) -> Result<Resource, RegistryError> {
        let mut resource = self.require(path)?.clone();
        if resource.is_collection() {
            resource.content = Content::Children(self.children_of(path));
        }
        Ok(resource)
    }

    /// Create missing ancestors of `path` as collections.
    fn ensure_parents(&mut self, path: &str, scope: &RequestScope) -> Result<(), RegistryError> {
        let mut missing = Vec::new();
        let mut cursor = parent_of(path);
        while let Some(parent) = cursor {
            match self.resources.get(parent) {
                Some(existing) if existing.is_collection() => break,
                Some(_) => {
                    return Err(RegistryError::InvalidPath {
                        path: path.to_string(),
                        reason: format!("parent {parent} is not a collection"),
                    })
                }
                None => missing.push(parent.to_string()),
            }
            cursor = parent_of(parent);
        }
        for parent in missing.into_iter().rev() {
            let mut collection = Resource::collection(parent.clone(), Vec::new());
            collection.author = Some(scope.user());
            collection.tenant_id = scope.tenant_id();
            self.resources.insert(parent, collection);
        }
        Ok(())
    }

    fn store(
        &mut self,
        scope: &RequestScope,
        path: &str,
        mut resource: Resource,
    ) -> Result<(), RegistryError> {
        self.ensure_parents(path, scope)?;
        let previous_author = self.resources.get(path).and_then(|r| r.author.clone());
        resource.path = path.to_string();
        resource.author = resource.author.or(previous_author).or_else(|| Some(scope.user()));
        resource.user_name = Some(scope.user());
        resource.tenant_id = scope.tenant_id();
        if resource.is_collection() {
            resource.content = Content::Children(Vec::new());
        }
        self.resources.insert(path.to_string(), resource);
        Ok(())
    }

    fn remove_subtree(&mut self, root: &str) {
        for key in self.subtree(root) {
            self.resources.remove(&key);
            self.tags.remove(&key);
            self.comments.remove(&key);
            self.ratings.remove(&key);
        }
        self.associations
            .retain(|a| !is_within(root, &a.source_path) && !is_within(root, &a.destination_path));
    }

    /// Copy (or move) the subtree at `from` to `to`.
    fn relocate(
        &mut self,
        scope: &RequestScope,
        from: &str,
        to: &str,
        keep_source: bool,
    ) -> Result<(), RegistryError> {
        self.require(from)?;
        if self.resources.contains_key(to) {
            return Err(RegistryError::AlreadyExists { path: to.to_string() });
        }
        if from == ROOT_PATH || is_within(from, to) {
            return Err(RegistryError::InvalidPath {
                path: to.to_string(),
                reason: format!("cannot relocate {from} into itself"),
            });
        }
        self.ensure_parents(to, scope)?;

        for key in self.subtree(from) {
            let target = rebase(&key, from, to);
            if let Some(mut resource) = self.resources.get(&key).cloned() {
                resource.path = target.clone();
                self.resources.insert(target.clone(), resource);
            }
            if let Some(tags) = self.tags.get(&key).cloned() {
                self.tags.insert(target.clone(), tags);
            }
            if !keep_source {
                if let Some(mut comments) = self.comments.remove(&key) {
                    for comment in &mut comments {
                        if let Some(old) = comment.path.take() {
                            let id = old.rsplit(COMMENT_PARAM).next().unwrap_or_default();
                            comment.path = Some(format!("{target}{COMMENT_PARAM}{id}"));
                        }
                    }
                    self.comments.insert(target.clone(), comments);
                }
                if let Some(ratings) = self.ratings.remove(&key) {
                    self.ratings.insert(target, ratings);
                }
            }
        }

        if keep_source {
            return Ok(());
        }
        for association in &mut self.associations {
            if is_within(from, &association.source_path) {
                association.source_path = rebase(&association.source_path, from, to);
            }
            if is_within(from, &association.destination_path) {
                association.destination_path = rebase(&association.destination_path, from, to);
            }
        }
        for key in self.subtree(from) {
            self.resources.remove(&key);
            self.tags.remove(&key);
        }
        Ok(())
    }
}

// ─── MemoryStore ─────────────────────────────────────────────────────────────

/// Thread-safe in-memory hierarchical registry.
///
/// Clones share state. [`read_only_view`](Self::read_only_view) returns a
/// clone that rejects writes.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::new())),
            read_only: false,
        }
    }

    /// A view over the same data that rejects every write.
    pub fn read_only_view(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of stored resources, including the root collection.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// All stored paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.inner.read().unwrap().resources.keys().cloned().collect()
    }

    /// Link nodes and their targets.
    pub fn links(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .unwrap()
            .resources
            .values()
            .filter(|r| r.property(REGISTRY_LINK) == Some("true"))
            .filter_map(|r| {
                r.property(REGISTRY_TARGET_POINT)
                    .map(|target| (r.path.clone(), target.to_string()))
            })
            .collect()
    }

    /// Restore a dump archive file into `path`.
    ///
    /// Returns the number of resources loaded.
    pub fn load_file(
        &self,
        scope: &RequestScope,
        path: &str,
        file: &Path,
    ) -> Result<usize, RegistryError> {
        let mut reader = std::fs::File::open(file).map_err(RegistryError::Io)?;
        let before = self.len();
        self.restore(scope, path, &mut reader)?;
        Ok(self.len().saturating_sub(before))
    }

    fn check_writable(&self, action: &str, path: &str) -> Result<(), RegistryError> {
        if self.read_only {
            return Err(RegistryError::ReadOnly {
                action: action.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn write_archive(
        &self,
        path: &str,
        out: &mut dyn Write,
        with_content: bool,
    ) -> Result<(), RegistryError> {
        let root = normalize(path)?;
        let archive = {
            let inner = self.inner.read().unwrap();
            inner.require(&root)?;
            let entries = inner
                .subtree(&root)
                .into_iter()
                .filter_map(|key| {
                    let mut resource = inner.resources.get(&key)?.clone();
                    if !with_content && !resource.is_collection() {
                        resource.content = Content::Empty;
                    }
                    Some(DumpEntry {
                        path: relative(&root, &key).to_string(),
                        resource,
                        tags: inner.tags.get(&key).cloned().unwrap_or_default(),
                        comments: inner.comments.get(&key).cloned().unwrap_or_default(),
                        ratings: inner.ratings.get(&key).cloned().unwrap_or_default(),
                    })
                })
                .collect();
            DumpArchive {
                version: DUMP_VERSION,
                entries,
            }
        };
        serde_json::to_writer(&mut *out, &archive)?;
        out.flush()?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("resources", &self.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl RegistryStore for MemoryStore {
    fn get(&self, _scope: &RequestScope, path: &str) -> Result<Resource, RegistryError> {
        let path = normalize(path)?;
        self.inner.read().unwrap().read(&path)
    }

    fn put(
        &self,
        scope: &RequestScope,
        path: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        self.check_writable("put", path)?;
        let path = normalize(path)?;
        self.inner.write().unwrap().store(scope, &path, resource)?;
        debug!(path = %path, "resource stored");
        Ok(path)
    }

    fn delete(&self, _scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        self.check_writable("delete", path)?;
        let path = normalize(path)?;
        if path == ROOT_PATH {
            return Err(RegistryError::InvalidPath {
                path,
                reason: "the root collection cannot be deleted".into(),
            });
        }
        let mut inner = self.inner.write().unwrap();
        inner.require(&path)?;
        inner.remove_subtree(&path);
        Ok(())
    }

    fn resource_exists(&self, _scope: &RequestScope, path: &str) -> Result<bool, RegistryError> {
        let path = normalize(path)?;
        Ok(self.inner.read().unwrap().resources.contains_key(&path))
    }

    fn rename(
        &self,
        scope: &RequestScope,
        path: &str,
        new_path: &str,
    ) -> Result<String, RegistryError> {
        let source = normalize(path)?;
        let target = if new_path.starts_with('/') {
            normalize(new_path)?
        } else {
            join(parent_of(&source).unwrap_or(ROOT_PATH), &format!("/{new_path}"))
        };
        self.move_resource(scope, &source, &target)
    }

    fn move_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        self.check_writable("move", path)?;
        let source = normalize(path)?;
        let target = normalize(target)?;
        self.inner
            .write()
            .unwrap()
            .relocate(scope, &source, &target, false)?;
        Ok(target)
    }

    fn copy(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<String, RegistryError> {
        self.check_writable("copy", target)?;
        let source = normalize(path)?;
        let target = normalize(target)?;
        self.inner
            .write()
            .unwrap()
            .relocate(scope, &source, &target, true)?;
        Ok(target)
    }

    fn import_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        source_url: &str,
        resource: Resource,
    ) -> Result<String, RegistryError> {
        let resource = resource.with_property(SOURCE_URL_PROPERTY, source_url);
        self.put(scope, path, resource)
    }

    fn create_link(
        &self,
        scope: &RequestScope,
        path: &str,
        target: &str,
    ) -> Result<(), RegistryError> {
        self.check_writable("create link", path)?;
        let path = normalize(path)?;
        let link = Resource::collection(path.clone(), Vec::new())
            .with_property(REGISTRY_LINK, "true")
            .with_property(REGISTRY_MOUNT_POINT, path.clone())
            .with_property(REGISTRY_TARGET_POINT, target);
        let mut inner = self.inner.write().unwrap();
        inner.remove_subtree(&path);
        inner.store(scope, &path, link)
    }

    fn remove_link(&self, _scope: &RequestScope, path: &str) -> Result<(), RegistryError> {
        self.check_writable("remove link", path)?;
        let path = normalize(path)?;
        let mut inner = self.inner.write().unwrap();
        let is_link = inner
            .resources
            .get(&path)
            .map(|r| r.property(REGISTRY_LINK) == Some("true"))
            .unwrap_or(false);
        if is_link {
            inner.remove_subtree(&path);
        }
        Ok(())
    }

    fn add_association(
        &self,
        _scope: &RequestScope,
        source: &str,
        target: &str,
        association_type: &str,
    ) -> Result<(), RegistryError> {
        self.check_writable("add association", source)?;
        let source = normalize(source)?;
        let mut inner = self.inner.write().unwrap();
        inner.require(&source)?;
        let association = Association::new(source, target, association_type);
        if !inner.associations.contains(&association) {
            inner.associations.push(association);
        }
        Ok(())
    }

    fn remove_association(
        &self,
        _scope: &RequestScope,
        source: &str,
        target: &str,
        association_type: &str,
    ) -> Result<(), RegistryError> {
        self.check_writable("remove association", source)?;
        let source = normalize(source)?;
        self.inner.write().unwrap().associations.retain(|a| {
            !(a.source_path == source
                && a.destination_path == target
                && a.association_type == association_type)
        });
        Ok(())
    }

    fn get_all_associations(
        &self,
        _scope: &RequestScope,
        path: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        let path = normalize(path)?;
        Ok(self
            .inner
            .read()
            .unwrap()
            .associations
            .iter()
            .filter(|a| a.source_path == path || a.destination_path == path)
            .cloned()
            .collect())
    }

    fn get_associations(
        &self,
        scope: &RequestScope,
        path: &str,
        association_type: &str,
    ) -> Result<Vec<Association>, RegistryError> {
        let mut all = self.get_all_associations(scope, path)?;
        all.retain(|a| a.association_type == association_type);
        Ok(all)
    }

    fn apply_tag(&self, scope: &RequestScope, path: &str, tag: &str) -> Result<(), RegistryError> {
        self.check_writable("tag", path)?;
        let path = normalize(path)?;
        let mut inner = self.inner.write().unwrap();
        inner.require(&path)?;
        inner
            .tags
            .entry(path)
            .or_default()
            .entry(tag.to_string())
            .or_default()
            .insert(scope.user());
        Ok(())
    }

    fn remove_tag(
        &self,
        _scope: &RequestScope,
        path: &str,
        tag: &str,
    ) -> Result<(), RegistryError> {
        self.check_writable("untag", path)?;
        let path = normalize(path)?;
        let mut inner = self.inner.write().unwrap();
        if let Some(tags) = inner.tags.get_mut(&path) {
            tags.remove(tag);
        }
        Ok(())
    }

    fn get_tags(&self, _scope: &RequestScope, path: &str) -> Result<Vec<Tag>, RegistryError> {
        let path = normalize(path)?;
        let inner = self.inner.read().unwrap();
        inner.require(&path)?;
        Ok(inner
            .tags
            .get(&path)
            .map(|tags| {
                tags.iter()
                    .map(|(name, users)| Tag {
                        name: name.clone(),
                        count: users.len() as u64,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_resource_paths_with_tag(
        &self,
        _scope: &RequestScope,
        tag: &str,
    ) -> Result<Vec<TaggedResourcePath>, RegistryError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .tags
            .iter()
            .filter_map(|(path, tags)| {
                tags.get(tag).map(|users| TaggedResourcePath {
                    resource_path: path.clone(),
                    tag_count: users.len() as u64,
                })
            })
            .collect())
    }

    fn add_comment(
        &self,
        scope: &RequestScope,
        path: &str,
        mut comment: Comment,
    ) -> Result<String, RegistryError> {
        self.check_writable("comment on", path)?;
        let path = normalize(path)?;
        let mut inner = self.inner.write().unwrap();
        inner.require(&path)?;
        let id = inner.next_comment_id;
        inner.next_comment_id += 1;
        let comment_path = format!("{path}{COMMENT_PARAM}{id}");
        comment.path = Some(comment_path.clone());
        if comment.user.is_empty() {
            comment.user = scope.user();
        }
        inner.comments.entry(path).or_default().push(comment);
        Ok(comment_path)
    }

    fn remove_comment(
        &self,
        _scope: &RequestScope,
        comment_path: &str,
    ) -> Result<(), RegistryError> {
        self.check_writable("remove comment", comment_path)?;
        if !comment_path.contains(COMMENT_PARAM) {
            return Err(RegistryError::InvalidPath {
                path: comment_path.to_string(),
                reason: "not a comment path".into(),
            });
        }
        let path = normalize(comment_path)?;
        let mut inner = self.inner.write().unwrap();
        let comments = inner
            .comments
            .get_mut(&path)
            .ok_or_else(|| RegistryError::not_found(comment_path))?;
        let before = comments.len();
        comments.retain(|c| c.path.as_deref() != Some(comment_path));
        if comments.len() == before {
            return Err(RegistryError::not_found(comment_path));
        }
        Ok(())
    }

    fn get_comments(
        &self,
        _scope: &RequestScope,
        path: &str,
    ) -> Result<Vec<Comment>, RegistryError> {
        let path = normalize(path)?;
        let inner = self.inner.read().unwrap();
        inner.require(&path)?;
        Ok(inner.comments.get(&path).cloned().unwrap_or_default())
    }

    fn rate_resource(
        &self,
        scope: &RequestScope,
        path: &str,
        rating: u8,
    ) -> Result<(), RegistryError> {
        self.check_writable("rate", path)?;
        if rating > 5 {
            return Err(RegistryError::Other(format!(
                "Rating must be between 0 and 5, got {rating}"
            )));
        }
        let path = normalize(path)?;
        let mut inner = self.inner.write().unwrap();
        inner.require(&path)?;
        inner
            .ratings
            .entry(path)
            .or_default()
            .insert(scope.user(), rating);
        Ok(())
    }

    fn get_rating(
        &self,
        _scope: &RequestScope,
        path: &str,
        user: &str,
    ) -> Result<u8, RegistryError> {
        let path = normalize(path)?;
        let inner = self.inner.read().unwrap();
        inner.require(&path)?;
        Ok(inner
            .ratings
            .get(&path)
            .and_then(|r| r.get(user).copied())
            .unwrap_or(0))
    }

    fn get_average_rating(&self, _scope: &RequestScope, path: &str) -> Result<f32, RegistryError> {
        let path = normalize(path)?;
        let inner = self.inner.read().unwrap();
        inner.require(&path)?;
        let ratings = match inner.ratings.get(&path) {
            Some(r) if !r.is_empty() => r,
            _ => return Ok(0.0),
        };
        let total: u32 = ratings.values().map(|&r| u32::from(r)).sum();
        Ok(total as f32 / ratings.len() as f32)
    }

    /// Supported criteria: `mediaType` (exact), `name` (substring of the last
    /// segment), `propertyName` with optional `propertyValue`, and `tag`.
    /// When `path` names a stored query, its properties fill in criteria the
    /// caller did not pass.
    fn execute_query(
        &self,
        _scope: &RequestScope,
        path: Option<&str>,
        params: &QueryParams,
    ) -> Result<Resource, RegistryError> {
        let inner = self.inner.read().unwrap();
        let mut criteria = params.clone();
        if let Some(path) = path {
            let query = inner.require(&normalize(path)?)?;
            for (key, values) in &query.properties {
                if let Some(first) = values.first() {
                    criteria.entry(key.clone()).or_insert_with(|| first.clone());
                }
            }
        }

        let matches: Vec<String> = inner
            .resources
            .values()
            .filter(|r| r.path != ROOT_PATH)
            .filter(|r| match criteria.get("mediaType") {
                Some(media_type) => r.media_type.as_deref() == Some(media_type.as_str()),
                None => true,
            })
            .filter(|r| match criteria.get("name") {
                Some(name) => name_of(&r.path).contains(name.as_str()),
                None => true,
            })
            .filter(|r| match criteria.get("propertyName") {
                Some(key) => match (r.properties.get(key), criteria.get("propertyValue")) {
                    (Some(values), Some(expected)) => values.iter().any(|v| v == expected),
                    (Some(_), None) => true,
                    (None, _) => false,
                },
                None => true,
            })
            .filter(|r| match criteria.get("tag") {
                Some(tag) => inner
                    .tags
                    .get(&r.path)
                    .map(|t| t.contains_key(tag))
                    .unwrap_or(false),
                None => true,
            })
            .map(|r| r.path.clone())
            .collect();
        Ok(Resource::collection(ROOT_PATH, matches))
    }

    fn dump(
        &self,
        _scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.write_archive(path, out, true)
    }

    fn dump_lite(
        &self,
        _scope: &RequestScope,
        path: &str,
        out: &mut dyn Write,
    ) -> Result<(), RegistryError> {
        self.write_archive(path, out, false)
    }

    fn restore(
        &self,
        scope: &RequestScope,
        path: &str,
        input: &mut dyn Read,
    ) -> Result<(), RegistryError> {
        self.check_writable("restore", path)?;
        let root = normalize(path)?;
        let archive: DumpArchive = serde_json::from_reader(input)?;
        if archive.version != DUMP_VERSION {
            return Err(RegistryError::Other(format!(
                "Unsupported dump version {}",
                archive.version
            )));
        }

        let mut inner = self.inner.write().unwrap();
        for entry in archive.entries {
            let target = join(&root, &entry.path);
            inner.store(scope, &target, entry.resource)?;
            if !entry.tags.is_empty() {
                inner.tags.insert(target.clone(), entry.tags);
            }
            if !entry.ratings.is_empty() {
                inner.ratings.insert(target.clone(), entry.ratings);
            }
            for mut comment in entry.comments {
                let id = inner.next_comment_id;
                inner.next_comment_id += 1;
                comment.path = Some(format!("{target}{COMMENT_PARAM}{id}"));
                inner.comments.entry(target.clone()).or_default().push(comment);
            }
        }
        debug!(path = %root, "dump restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regmount_core::Session;

    fn scope() -> RequestScope {
        RequestScope::new(Session::new("alice", 1))
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let s = scope();
        store
            .put(&s, "/data/a.xml", Resource::new("").with_bytes("a").with_media_type("text/xml"))
            .unwrap();
        store
            .put(&s, "/data/sub/b.txt", Resource::new("").with_bytes("bb"))
            .unwrap();
        store
    }

    #[test]
    fn put_creates_parent_collections() {
        let store = seeded();
        let s = scope();
        let data = store.get(&s, "/data").unwrap();
        assert!(data.is_collection());
        assert_eq!(
            data.children(),
            ["/data/a.xml".to_string(), "/data/sub".to_string()]
        );
        let a = store.get(&s, "/data/a.xml/").unwrap();
        assert_eq!(a.bytes(), b"a");
        assert_eq!(a.author.as_deref(), Some("alice"));
    }

    #[test]
    fn put_under_plain_resource_is_rejected() {
        let store = seeded();
        let err = store
            .put(&scope(), "/data/a.xml/child", Resource::new(""))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPath { .. }));
    }

    #[test]
    fn delete_removes_subtree_and_metadata() {
        let store = seeded();
        let s = scope();
        store.apply_tag(&s, "/data/sub/b.txt", "t").unwrap();
        store.delete(&s, "/data/sub").unwrap();
        assert!(!store.resource_exists(&s, "/data/sub/b.txt").unwrap());
        assert!(store.get_resource_paths_with_tag(&s, "t").unwrap().is_empty());
        assert!(store.delete(&s, "/data/sub").unwrap_err().is_not_found());
    }

    #[test]
    fn move_carries_comments_and_rejects_existing_target() {
        let store = seeded();
        let s = scope();
        store
            .add_comment(&s, "/data/a.xml", Comment::new("hi", "alice"))
            .unwrap();
        let moved = store.move_resource(&s, "/data/a.xml", "/other/a.xml").unwrap();
        assert_eq!(moved, "/other/a.xml");
        let comments = store.get_comments(&s, "/other/a.xml").unwrap();
        assert_eq!(comments[0].path.as_deref(), Some("/other/a.xml;comments:1"));
        assert!(!store.resource_exists(&s, "/data/a.xml").unwrap());

        let err = store.copy(&s, "/data/sub", "/other/a.xml").unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
    }

    #[test]
    fn rename_accepts_sibling_names() {
        let store = seeded();
        let s = scope();
        assert_eq!(store.rename(&s, "/data/sub", "renamed").unwrap(), "/data/renamed");
        assert!(store.resource_exists(&s, "/data/renamed/b.txt").unwrap());
    }

    #[test]
    fn comments_round_trip_through_paths() {
        let store = seeded();
        let s = scope();
        let path = store
            .add_comment(&s, "/data/a.xml", Comment::new("first", "alice"))
            .unwrap();
        assert_eq!(path, "/data/a.xml;comments:1");
        store.remove_comment(&s, &path).unwrap();
        assert!(store.get_comments(&s, "/data/a.xml").unwrap().is_empty());
        assert!(store.remove_comment(&s, &path).unwrap_err().is_not_found());
    }

    #[test]
    fn ratings_are_per_user() {
        let store = seeded();
        store.rate_resource(&scope(), "/data/a.xml", 4).unwrap();
        let bob = RequestScope::new(Session::new("bob", 1));
        store.rate_resource(&bob, "/data/a.xml", 2).unwrap();
        assert_eq!(store.get_rating(&bob, "/data/a.xml", "alice").unwrap(), 4);
        assert_eq!(store.get_average_rating(&bob, "/data/a.xml").unwrap(), 3.0);
        assert_eq!(store.get_average_rating(&bob, "/data/sub").unwrap(), 0.0);
        assert!(store.rate_resource(&bob, "/data/a.xml", 9).is_err());
    }

    #[test]
    fn query_filters_by_media_type_and_tag() {
        let store = seeded();
        let s = scope();
        store.apply_tag(&s, "/data/sub/b.txt", "important").unwrap();
        let mut params = QueryParams::new();
        params.insert("mediaType".into(), "text/xml".into());
        let result = store.execute_query(&s, None, &params).unwrap();
        assert_eq!(result.children(), ["/data/a.xml".to_string()]);

        let mut params = QueryParams::new();
        params.insert("tag".into(), "important".into());
        let result = store.execute_query(&s, None, &params).unwrap();
        assert_eq!(result.children(), ["/data/sub/b.txt".to_string()]);
    }

    #[test]
    fn dump_and_restore_relocate_subtree() {
        let store = seeded();
        let s = scope();
        store.apply_tag(&s, "/data/sub/b.txt", "t").unwrap();
        let mut buf = Vec::new();
        store.dump(&s, "/data/sub", &mut buf).unwrap();

        let other = MemoryStore::new();
        other.restore(&s, "/copy", &mut buf.as_slice()).unwrap();
        assert_eq!(other.get(&s, "/copy/b.txt").unwrap().bytes(), b"bb");
        assert_eq!(other.get_tags(&s, "/copy/b.txt").unwrap()[0].name, "t");
    }

    #[test]
    fn dump_lite_omits_content() {
        let store = seeded();
        let s = scope();
        let mut buf = Vec::new();
        store.dump_lite(&s, "/data/a.xml", &mut buf).unwrap();
        let archive: DumpArchive = serde_json::from_slice(&buf).unwrap();
        assert_eq!(archive.entries.len(), 1);
        assert!(archive.entries[0].resource.bytes().is_empty());
    }

    #[test]
    fn links_are_collections_carrying_their_target() {
        let store = MemoryStore::new();
        let s = scope();
        store.create_link(&s, "/remote", "instance-a").unwrap();
        let link = store.get(&s, "/remote").unwrap();
        assert!(link.is_collection());
        assert_eq!(link.property(REGISTRY_TARGET_POINT), Some("instance-a"));
        assert_eq!(store.links().get("/remote").map(String::as_str), Some("instance-a"));

        store.remove_link(&s, "/remote").unwrap();
        store.remove_link(&s, "/remote").unwrap();
        assert!(!store.resource_exists(&s, "/remote").unwrap());
    }

    #[test]
    fn read_only_view_rejects_writes_but_sees_data() {
        let store = seeded();
        let view = store.read_only_view();
        let s = scope();
        assert!(view.get(&s, "/data/a.xml").is_ok());
        let err = view.put(&s, "/x", Resource::new("")).unwrap_err();
        assert!(matches!(err, RegistryError::ReadOnly { .. }));
    }
}
