//! Error types shared by every RegMount crate.

use thiserror::Error;

/// Boxed cause used where the failing layer is not a registry call
/// (URL parsing, provider construction, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by registry stores, handlers and mount resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The resource is absent. `path` is always the path the caller asked for,
    /// never a translated internal path.
    #[error("Resource does not exist at path {path}")]
    NotFound {
        path: String,
        #[source]
        source: Option<Box<RegistryError>>,
    },

    #[error("User '{user}' is not authorized to {action} {path}")]
    Unauthorized {
        user: String,
        action: String,
        path: String,
    },

    #[error("Resource already exists at path {path}")]
    AlreadyExists { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Registry is read-only: cannot {action} {path}")]
    ReadOnly { action: String, path: String },

    /// Endpoint resolution failed (bad URL, no provider, no connector, ...).
    #[error("Mount configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A delegated registry call failed; `message` names the operation.
    #[error("{message}")]
    Delegate {
        message: String,
        #[source]
        source: Box<RegistryError>,
    },

    #[error("Operation '{operation}' is not supported by this registry")]
    Unsupported { operation: &'static str },

    #[error("Missing request argument: {0}")]
    MissingArgument(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl RegistryError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Not-found carrying the failure that made the resource unreachable.
    pub fn not_found_caused_by(path: impl Into<String>, cause: RegistryError) -> Self {
        Self::NotFound {
            path: path.into(),
            source: Some(Box::new(cause)),
        }
    }

    pub fn delegate(message: impl Into<String>, cause: RegistryError) -> Self {
        Self::Delegate {
            message: message.into(),
            source: Box::new(cause),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn configuration_caused_by(
        message: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Returns `true` if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the error came from endpoint resolution.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
