//! Mock CalicoClient for unit testing
//!
//! In-memory implementation of [`CalicoClientTrait`] with a call log,
//! queued failures and an optional artificial latency.

use crate::calico_trait::CalicoClientTrait;
use crate::error::CalicoError;
use crate::models::{ObjectKey, Operation};
use policy_document::Document;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock CalicoClient for testing
///
/// Clones share state, so a test can keep one handle while the reconciler
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct MockCalicoClient {
    policies: Arc<Mutex<BTreeMap<ObjectKey, Document>>>,
    calls: Arc<Mutex<Vec<(Operation, ObjectKey)>>>,
    failures: Arc<Mutex<HashMap<Operation, VecDeque<CalicoError>>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockCalicoClient {
    /// Create a new, empty mock client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy to the mock store (for test setup)
    pub fn insert_policy(&self, key: ObjectKey, policy: Document) {
        lock(&self.policies).insert(key, policy);
    }

    /// Current stored object for `key`
    #[must_use]
    pub fn policy(&self, key: &ObjectKey) -> Option<Document> {
        lock(&self.policies).get(key).cloned()
    }

    /// All stored keys, in order
    #[must_use]
    pub fn keys(&self) -> Vec<ObjectKey> {
        lock(&self.policies).keys().cloned().collect()
    }

    /// Every call made so far, including failed ones
    #[must_use]
    pub fn calls(&self) -> Vec<(Operation, ObjectKey)> {
        lock(&self.calls).clone()
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: CalicoError) {
        lock(&self.failures).entry(operation).or_default().push_back(error);
    }

    /// Delay every call by `delay` before it touches the store
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    async fn begin(&self, operation: Operation, key: &ObjectKey) -> Result<(), CalicoError> {
        lock(&self.calls).push((operation, key.clone()));
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match lock(&self.failures).get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl CalicoClientTrait for MockCalicoClient {
    async fn create_policy(&self, policy: &Document) -> Result<(), CalicoError> {
        let key = ObjectKey::from_document(policy)?;
        self.begin(Operation::Create, &key).await?;
        let mut policies = lock(&self.policies);
        if policies.contains_key(&key) {
            return Err(CalicoError::AlreadyExists(key));
        }
        policies.insert(key, policy.clone());
        Ok(())
    }

    async fn replace_policy(&self, policy: &Document) -> Result<(), CalicoError> {
        let key = ObjectKey::from_document(policy)?;
        self.begin(Operation::Replace, &key).await?;
        match lock(&self.policies).get_mut(&key) {
            Some(existing) => {
                *existing = policy.clone();
                Ok(())
            }
            None => Err(CalicoError::NotFound(key)),
        }
    }

    async fn delete_policy(&self, key: &ObjectKey) -> Result<(), CalicoError> {
        self.begin(Operation::Delete, key).await?;
        match lock(&self.policies).remove(key) {
            Some(_) => Ok(()),
            None => Err(CalicoError::NotFound(key.clone())),
        }
    }
}
