//! Calico client errors

use crate::models::{ObjectKey, Operation};
use thiserror::Error;

/// Errors that can occur when writing Calico policy objects
#[derive(Debug, Error)]
pub enum CalicoError {
    /// Create hit an existing object with the same key
    #[error("policy {0} already exists")]
    AlreadyExists(ObjectKey),

    /// The object does not exist
    #[error("policy {0} not found")]
    NotFound(ObjectKey),

    /// Replace lost a race against a concurrent writer
    #[error("conflicting update to policy {0}")]
    Conflict(ObjectKey),

    /// The target kind is served cluster-wide and cannot mirror a namespaced policy
    #[error("{0} is not a namespaced resource")]
    NotNamespaced(String),

    /// Any other Kubernetes API failure
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The document could not be represented as a Kubernetes object
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The document lacks what is needed to address it
    #[error("Invalid policy document: {0}")]
    InvalidDocument(String),
}

impl CalicoError {
    /// Maps an API failure onto the outcome the reconciler cares about.
    ///
    /// A 409 means "already exists" for a create and a stale
    /// `resourceVersion` for a replace.
    pub(crate) fn from_kube(err: kube::Error, operation: Operation, key: &ObjectKey) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => Self::NotFound(key.clone()),
            kube::Error::Api(ref response) if response.code == 409 => match operation {
                Operation::Create => Self::AlreadyExists(key.clone()),
                Operation::Replace | Operation::Delete => Self::Conflict(key.clone()),
            },
            other => Self::Kube(other),
        }
    }
}
