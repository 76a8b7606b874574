//! Reconciliation of upstream policy events against the Calico API.

use crate::error::ControllerError;
use crate::events::{PolicyEvent, UpstreamPolicy};
use crate::materializer::{materialize, stamp_identity};
use crate::template::PolicyTemplate;
use calico_client::{CalicoClientTrait, CalicoError, ObjectKey, Operation};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Whether the downstream mirror of an upstream policy is known to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Absent,
    Present,
}

/// Reconciles upstream NetworkPolicy events into Calico policies.
pub struct Reconciler {
    calico_client: Box<dyn CalicoClientTrait + Send + Sync>,
    template: Arc<PolicyTemplate>,
    request_timeout: Duration,
    /// Keys whose mirror was last seen present
    states: Mutex<HashMap<ObjectKey, PolicyState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("template", &self.template)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(
        calico_client: Box<dyn CalicoClientTrait + Send + Sync>,
        template: Arc<PolicyTemplate>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            calico_client,
            template,
            request_timeout,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Last known state of the mirror for `key`.
    pub fn state(&self, key: &ObjectKey) -> PolicyState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(PolicyState::Absent)
    }

    /// Dispatches one event.
    pub async fn reconcile(&self, event: &PolicyEvent) -> Result<(), ControllerError> {
        match event {
            PolicyEvent::Added(policy) | PolicyEvent::Updated(policy) => self.apply_policy(policy).await,
            PolicyEvent::Deleted(policy) => self.remove_policy(&policy.key).await,
        }
    }

    /// Creates or replaces the mirror of `upstream`.
    ///
    /// The downstream object is always rebuilt from the template; nothing is
    /// read back for comparison.
    pub async fn apply_policy(&self, upstream: &UpstreamPolicy) -> Result<(), ControllerError> {
        let key = &upstream.key;
        let mut policy = materialize(&upstream.document, self.template.document())?;
        stamp_identity(&mut policy, key)?;

        match self.bounded(Operation::Create, key, self.calico_client.create_policy(&policy)).await {
            Ok(()) => info!("Created Calico policy {}", key),
            Err(ControllerError::Calico(CalicoError::AlreadyExists(_))) => {
                debug!("Calico policy {} already exists, replacing", key);
                self.bounded(Operation::Replace, key, self.calico_client.replace_policy(&policy))
                    .await?;
                info!("Replaced Calico policy {}", key);
            }
            Err(e) => return Err(e),
        }

        self.set_state(key, PolicyState::Present);
        Ok(())
    }

    /// Deletes the mirror for `key`. A mirror that is already gone counts as success.
    pub async fn remove_policy(&self, key: &ObjectKey) -> Result<(), ControllerError> {
        if self.state(key) == PolicyState::Absent {
            debug!("No mirror recorded for {}, deleting anyway", key);
        }
        match self.bounded(Operation::Delete, key, self.calico_client.delete_policy(key)).await {
            Ok(()) => info!("Deleted Calico policy {}", key),
            Err(ControllerError::Calico(CalicoError::NotFound(_))) => {
                debug!("Calico policy {} already absent", key);
            }
            Err(e) => return Err(e),
        }

        self.set_state(key, PolicyState::Absent);
        Ok(())
    }

    async fn bounded(
        &self,
        operation: Operation,
        key: &ObjectKey,
        call: impl Future<Output = Result<(), CalicoError>>,
    ) -> Result<(), ControllerError> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_elapsed| ControllerError::Timeout {
                operation,
                key: key.clone(),
                after: self.request_timeout,
            })?
            .map_err(ControllerError::from)
    }

    fn set_state(&self, key: &ObjectKey, state: PolicyState) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        match state {
            PolicyState::Present => {
                states.insert(key.clone(), state);
            }
            PolicyState::Absent => {
                states.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaterializeError;
    use crate::test_utils::{create_test_reconciler, upstream_policy};
    use calico_client::MockCalicoClient;
    use policy_document::Document;

    fn selector_of(mock: &MockCalicoClient, key: &ObjectKey) -> Option<String> {
        mock.policy(key)
            .and_then(|doc| doc.get_path(&["spec", "selector"]).and_then(Document::as_str).map(str::to_owned))
    }

    #[tokio::test]
    async fn test_added_creates_mirror() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy("prod", "web", r#"{"matchLabels": {"app": "email"}}"#);

        reconciler
            .reconcile(&PolicyEvent::Added(upstream.clone()))
            .await
            .expect("reconciles");

        assert_eq!(selector_of(&mock, &upstream.key).as_deref(), Some("app == 'email'"));
        assert_eq!(reconciler.state(&upstream.key), PolicyState::Present);

        let stored = mock.policy(&upstream.key).expect("stored");
        assert_eq!(ObjectKey::from_document(&stored).expect("keyed"), upstream.key);
        assert_eq!(stored.get("kind").and_then(Document::as_str), Some("NetworkPolicy"));
    }

    #[tokio::test]
    async fn test_update_replaces_existing_mirror() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let key = ObjectKey::new("prod", "web");

        reconciler
            .reconcile(&PolicyEvent::Added(upstream_policy("prod", "web", r#"{"matchLabels": {"app": "a"}}"#)))
            .await
            .expect("create");
        reconciler
            .reconcile(&PolicyEvent::Updated(upstream_policy("prod", "web", r#"{"matchLabels": {"app": "b"}}"#)))
            .await
            .expect("replace");

        assert_eq!(selector_of(&mock, &key).as_deref(), Some("app == 'b'"));
        assert_eq!(
            mock.calls().into_iter().map(|(op, _)| op).collect::<Vec<_>>(),
            [Operation::Create, Operation::Create, Operation::Replace]
        );
    }

    #[tokio::test]
    async fn test_added_over_preexisting_object_replaces() {
        let mock = MockCalicoClient::new();
        let key = ObjectKey::new("prod", "web");
        mock.insert_policy(key.clone(), Document::from_yaml_str("metadata: {namespace: prod, name: web}\n").expect("yaml"));
        let reconciler = create_test_reconciler(mock.clone());

        reconciler
            .reconcile(&PolicyEvent::Added(upstream_policy("prod", "web", "{}")))
            .await
            .expect("replace succeeds");

        assert_eq!(selector_of(&mock, &key).as_deref(), Some(""));
        assert_eq!(reconciler.state(&key), PolicyState::Present);
    }

    #[tokio::test]
    async fn test_delete_of_absent_mirror_succeeds() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy("prod", "ghost", "{}");

        reconciler
            .reconcile(&PolicyEvent::Deleted(upstream.clone()))
            .await
            .expect("NotFound is success");

        assert_eq!(reconciler.state(&upstream.key), PolicyState::Absent);
        assert_eq!(mock.calls(), [(Operation::Delete, upstream.key)]);
    }

    #[tokio::test]
    async fn test_delete_removes_mirror() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy("prod", "web", "{}");

        reconciler.reconcile(&PolicyEvent::Added(upstream.clone())).await.expect("create");
        reconciler.reconcile(&PolicyEvent::Deleted(upstream.clone())).await.expect("delete");

        assert!(mock.keys().is_empty());
        assert_eq!(reconciler.state(&upstream.key), PolicyState::Absent);
    }

    #[tokio::test]
    async fn test_materialization_error_never_calls_downstream() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy(
            "prod",
            "web",
            r#"{"matchExpressions": [{"key": "app", "operator": "In"}]}"#,
        );

        let err = reconciler
            .reconcile(&PolicyEvent::Added(upstream.clone()))
            .await
            .expect_err("In without values");

        assert!(matches!(err, ControllerError::Materialize(MaterializeError::Selector(_))));
        assert!(mock.calls().is_empty());
        assert_eq!(reconciler.state(&upstream.key), PolicyState::Absent);
    }

    #[tokio::test]
    async fn test_missing_pod_selector_is_rejected() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = UpstreamPolicy {
            key: ObjectKey::new("prod", "web"),
            document: Document::from_json_str(r#"{"metadata": {"namespace": "prod", "name": "web"}}"#)
                .expect("json parses"),
        };

        let err = reconciler.apply_policy(&upstream).await.expect_err("no spec");
        assert!(matches!(
            err,
            ControllerError::Materialize(MaterializeError::MissingField { path: "spec" })
        ));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_downstream_failure_leaves_state_unchanged() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy("prod", "web", "{}");

        reconciler.reconcile(&PolicyEvent::Added(upstream.clone())).await.expect("create");
        mock.fail_next(Operation::Delete, CalicoError::InvalidDocument("boom".to_string()));

        let err = reconciler
            .reconcile(&PolicyEvent::Deleted(upstream.clone()))
            .await
            .expect_err("delete fails");
        assert!(matches!(err, ControllerError::Calico(CalicoError::InvalidDocument(_))));
        assert_eq!(reconciler.state(&upstream.key), PolicyState::Present);
    }

    #[tokio::test]
    async fn test_replace_conflict_is_reported() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy("prod", "web", "{}");
        mock.fail_next(Operation::Create, CalicoError::AlreadyExists(upstream.key.clone()));
        mock.fail_next(Operation::Replace, CalicoError::Conflict(upstream.key.clone()));

        let err = reconciler
            .reconcile(&PolicyEvent::Updated(upstream.clone()))
            .await
            .expect_err("conflict");
        assert!(matches!(err, ControllerError::Calico(CalicoError::Conflict(_))));
        assert_eq!(reconciler.state(&upstream.key), PolicyState::Absent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_and_leaves_state_unchanged() {
        let mock = MockCalicoClient::new();
        mock.set_delay(Duration::from_secs(60));
        let reconciler = create_test_reconciler(mock.clone());
        let upstream = upstream_policy("prod", "web", "{}");

        let err = reconciler
            .reconcile(&PolicyEvent::Added(upstream.clone()))
            .await
            .expect_err("times out");
        assert_eq!(err.to_string(), "create of prod/web timed out after 10s");

        match err {
            ControllerError::Timeout { operation, key, after } => {
                assert_eq!(operation, Operation::Create);
                assert_eq!(key, upstream.key);
                assert_eq!(after, Duration::from_secs(10));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reconciler.state(&upstream.key), PolicyState::Absent);
        assert!(mock.keys().is_empty());
    }

    #[tokio::test]
    async fn test_template_is_shared_not_mutated() {
        let mock = MockCalicoClient::new();
        let reconciler = create_test_reconciler(mock.clone());
        let before = reconciler.template.document().clone();

        for name in ["a", "b", "c"] {
            let selector = format!(r#"{{"matchLabels": {{"app": "{name}"}}}}"#);
            reconciler
                .reconcile(&PolicyEvent::Added(upstream_policy("prod", name, &selector)))
                .await
                .expect("create");
        }

        assert_eq!(reconciler.template.document(), &before);
        assert_eq!(
            selector_of(&mock, &ObjectKey::new("prod", "b")).as_deref(),
            Some("app == 'b'")
        );
    }
}
