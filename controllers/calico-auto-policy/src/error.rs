//! Controller-specific error types.
//!
//! `ControllerError` covers everything that stops the controller; the
//! per-event `MaterializeError` only ever causes a single event to be dropped.

use calico_client::{CalicoError, ObjectKey, Operation};
use calico_selectors::SelectorError;
use kube::Error as KubeError;
use policy_document::DocumentError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the Calico auto-policy controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Downstream Calico API error
    #[error("Calico error: {0}")]
    Calico(#[from] CalicoError),

    /// An upstream policy could not be turned into a downstream one
    #[error("Materialization failed: {0}")]
    Materialize(#[from] MaterializeError),

    /// A watched object could not be converted into a document
    #[error("Unsupported object content: {0}")]
    Document(#[from] DocumentError),

    /// The policy template could not be loaded
    #[error("Failed to load policy template {}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A downstream call did not finish in time
    #[error("{operation} of {key} timed out after {after:?}")]
    Timeout {
        operation: Operation,
        key: ObjectKey,
        after: Duration,
    },

    /// Watch stream error
    #[error("Watch error: {0}")]
    Watch(String),
}

/// Why the template file was rejected.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("{0}")]
    Invalid(String),
}

/// Errors from turning one upstream policy into its downstream counterpart.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// A required upstream field is absent or not a mapping
    #[error("missing or non-mapping field {path}")]
    MissingField { path: &'static str },

    /// The pod selector could not be translated
    #[error("selector translation failed: {0}")]
    Selector(#[from] SelectorError),

    /// The generated document could not be completed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}
