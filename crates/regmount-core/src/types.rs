//! Resource model shared by stores, handlers and mounts.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tenant identifier.
pub type TenantId = i32;

/// Tenant used when no tenant is bound to the session.
pub const SUPER_TENANT_ID: TenantId = -1234;

/// Query parameters passed to `execute_query`.
pub type QueryParams = HashMap<String, String>;

// ─── Resource ────────────────────────────────────────────────────────────────

/// Resource payload: raw bytes for plain resources, child paths for collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Content {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Children(Vec<String>),
}

/// A resource or collection addressed by a `/`-separated path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User that created the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// User the resource was last read or written by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub tenant_id: TenantId,
    /// Multi-valued properties in insertion order.
    #[serde(default)]
    pub properties: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub content: Content,
}

impl Resource {
    /// A plain resource with no content.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            media_type: None,
            description: None,
            author: None,
            user_name: None,
            tenant_id: SUPER_TENANT_ID,
            properties: IndexMap::new(),
            content: Content::Empty,
        }
    }

    /// A collection with the given child paths.
    pub fn collection(path: impl Into<String>, children: Vec<String>) -> Self {
        Self {
            content: Content::Children(children),
            ..Self::new(path)
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.content = Content::Bytes(bytes.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.content, Content::Children(_))
    }

    /// Child paths of a collection; empty for plain resources.
    pub fn children(&self) -> &[String] {
        match &self.content {
            Content::Children(children) => children,
            _ => &[],
        }
    }

    /// Bytes of a plain resource; empty for collections.
    pub fn bytes(&self) -> &[u8] {
        match &self.content {
            Content::Bytes(bytes) => bytes,
            _ => &[],
        }
    }

    /// First value of a property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Replace all values of a property with a single value.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), vec![value.into()]);
    }

    /// Append a value to a (possibly multi-valued) property.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.entry(key.into()).or_default().push(value.into());
    }

    /// Remove a property, keeping the order of the remaining ones.
    pub fn remove_property(&mut self, key: &str) -> Option<Vec<String>> {
        self.properties.shift_remove(key)
    }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// A typed, directed link between two resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Association {
    pub source_path: String,
    pub destination_path: String,
    pub association_type: String,
}

impl Association {
    pub fn new(
        source_path: impl Into<String>,
        destination_path: impl Into<String>,
        association_type: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            association_type: association_type.into(),
        }
    }
}

/// A user comment attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// `<resource>;comments:<id>` once stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub text: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            path: None,
            text: text.into(),
            user: user.into(),
            created_at: Utc::now(),
        }
    }
}

/// A tag and how many times it was applied to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub count: u64,
}

/// A resource path returned by a tag search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedResourcePath {
    pub resource_path: String,
    pub tag_count: u64,
}
