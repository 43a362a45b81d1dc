//! Conversion between caller-facing (full) paths and the paths the mounted
//! registry understands (actual paths).

use regmount_core::constants::ROOT_PATH;
use regmount_core::{is_within, Association};

/// Maps paths across one mount.
///
/// A full path `/remote/foo.xml` under mount point `/remote` with sub-path
/// `/local/data` becomes the actual path `/local/data/foo.xml`, and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    mount_point: String,
    sub_path: String,
}

impl PathTranslator {
    /// `sub_path` must already be normalized
    /// (see [`normalize_sub_path`](crate::normalize_sub_path)).
    pub fn new(mount_point: impl Into<String>, sub_path: Option<&str>) -> Self {
        Self {
            mount_point: mount_point.into(),
            sub_path: sub_path.unwrap_or_default().to_string(),
        }
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn sub_path(&self) -> &str {
        &self.sub_path
    }

    /// `true` if `full_path` is the mount point or lies below it.
    pub fn contains(&self, full_path: &str) -> bool {
        is_within(&self.mount_point, full_path)
    }

    pub fn is_mount_root(&self, full_path: &str) -> bool {
        full_path == self.mount_point
    }

    /// Full path → actual path. Never returns an empty string.
    pub fn to_actual(&self, full_path: &str) -> String {
        let rest = if self.contains(full_path) {
            &full_path[self.mount_point.len()..]
        } else {
            full_path
        };
        let actual = format!("{}{}", self.sub_path, rest);
        if actual.is_empty() {
            ROOT_PATH.to_string()
        } else if actual.starts_with(';') {
            format!("{ROOT_PATH}{actual}")
        } else {
            actual
        }
    }

    /// Actual path → full path.
    ///
    /// The sub-path is stripped only when the path lies below it. With an
    /// empty sub-path every path is taken to live under the mount, including
    /// ones that were linked into the target's root from elsewhere.
    pub fn to_full(&self, actual_path: &str) -> String {
        let rest = if !self.sub_path.is_empty() && is_within(&self.sub_path, actual_path) {
            &actual_path[self.sub_path.len()..]
        } else {
            actual_path
        };
        if rest.is_empty() || rest == ROOT_PATH {
            self.mount_point.clone()
        } else if rest.starts_with(';') || rest.starts_with('/') {
            format!("{}{}", self.mount_point, rest)
        } else {
            format!("{}/{}", self.mount_point, rest)
        }
    }

    /// Like [`to_full`](Self::to_full), but only for paths below a non-empty
    /// sub-path; anything else is returned unchanged.
    pub fn to_full_if_under(&self, actual_path: &str) -> String {
        if !self.sub_path.is_empty() && is_within(&self.sub_path, actual_path) {
            self.to_full(actual_path)
        } else {
            actual_path.to_string()
        }
    }

    /// Rewrite an association returned by the mounted registry. The source
    /// always belongs to the mount; the destination only when it lies below
    /// the sub-path.
    pub fn association_to_full(&self, association: Association) -> Association {
        Association {
            source_path: self.to_full(&association.source_path),
            destination_path: self.to_full_if_under(&association.destination_path),
            association_type: association.association_type,
        }
    }
}
