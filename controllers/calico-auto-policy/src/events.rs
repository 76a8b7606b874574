//! Upstream policy events as seen by the reconciler.

use calico_client::ObjectKey;
use policy_document::Document;

/// An upstream NetworkPolicy, reduced to its identity and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamPolicy {
    pub key: ObjectKey,
    pub document: Document,
}

/// What happened to an upstream policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyEvent {
    /// First sighting of the object
    Added(UpstreamPolicy),
    /// A change to a known object, or a periodic resync
    Updated(UpstreamPolicy),
    /// The object is gone
    Deleted(UpstreamPolicy),
}

impl PolicyEvent {
    #[must_use]
    pub fn policy(&self) -> &UpstreamPolicy {
        match self {
            Self::Added(policy) | Self::Updated(policy) | Self::Deleted(policy) => policy,
        }
    }

    #[must_use]
    pub fn key(&self) -> &ObjectKey {
        &self.policy().key
    }

    /// Lower-case verb for log lines.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}
