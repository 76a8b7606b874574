//! Document errors

use thiserror::Error;

/// Errors that can occur when building or editing a [`Document`](crate::Document)
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A scalar kind the document tree cannot represent (floats, YAML tags)
    #[error("unsupported {kind} value at {path}")]
    UnsupportedScalar {
        /// Rendered path of the offending value
        path: String,
        /// Human-readable kind of the rejected value
        kind: &'static str,
    },

    /// A mapping key that is not a string
    #[error("unsupported non-string mapping key at {path}")]
    UnsupportedKey {
        /// Rendered path of the mapping holding the key
        path: String,
    },

    /// A path traversal hit a value that is not a mapping
    #[error("cannot set {path}: {segment} is not a mapping")]
    NotAMapping {
        /// Full path that was being set
        path: String,
        /// The intermediate segment that is not a mapping
        segment: String,
    },

    /// An empty path was given where at least one segment is required
    #[error("empty document path")]
    EmptyPath,

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
