//! CalicoClient trait for mocking
//!
//! The reconciler only talks to this trait, so unit tests can swap in
//! [`MockCalicoClient`](crate::MockCalicoClient) (feature `test-util`).

use crate::error::CalicoError;
use crate::models::ObjectKey;
use policy_document::Document;

/// Downstream policy operations.
///
/// Create and replace address the object through its own
/// `metadata.namespace` / `metadata.name`.
#[async_trait::async_trait]
pub trait CalicoClientTrait: Send + Sync {
    /// Creates the object. Fails with [`CalicoError::AlreadyExists`] when the key is taken.
    async fn create_policy(&self, policy: &Document) -> Result<(), CalicoError>;

    /// Replaces the object wholesale. Fails with [`CalicoError::NotFound`] when absent.
    async fn replace_policy(&self, policy: &Document) -> Result<(), CalicoError>;

    /// Deletes the object. Fails with [`CalicoError::NotFound`] when absent.
    async fn delete_policy(&self, key: &ObjectKey) -> Result<(), CalicoError>;
}
