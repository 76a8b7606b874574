//! Test utilities for unit testing the reconciler and watcher
//!
//! Helpers for building templates, upstream NetworkPolicies and a reconciler
//! backed by the in-memory Calico client.

use crate::events::UpstreamPolicy;
use crate::reconciler::Reconciler;
use crate::template::PolicyTemplate;
use calico_client::{MockCalicoClient, ObjectKey};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::core::{ApiResource, DynamicObject};
use policy_document::Document;
use std::sync::Arc;
use std::time::Duration;

/// A Calico NetworkPolicy template as it would be mounted into the pod
pub const TEMPLATE_YAML: &str = r"
apiVersion: projectcalico.org/v3
kind: NetworkPolicy
metadata:
  labels:
    managed-by: calico-auto-policy
spec:
  order: 100
  types:
    - Ingress
  ingress:
    - action: Allow
      protocol: TCP
      source:
        selector: has(monitoring)
      destination:
        ports: [9090]
";

/// Request timeout used by [`create_test_reconciler`]
pub const TEST_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Helper to load the test template
pub fn template() -> PolicyTemplate {
    let document = Document::from_yaml_str(TEMPLATE_YAML).expect("template parses");
    PolicyTemplate::from_document(document).expect("template is valid")
}

/// Helper to create an upstream NetworkPolicy document with the given `podSelector` JSON
pub fn network_policy(namespace: &str, name: &str, pod_selector_json: &str) -> Document {
    let pod_selector: serde_json::Value = serde_json::from_str(pod_selector_json).expect("valid selector JSON");
    let value = serde_json::json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "NetworkPolicy",
        "metadata": {"namespace": namespace, "name": name},
        "spec": {"podSelector": pod_selector, "policyTypes": ["Ingress"]},
    });
    Document::try_from(value).expect("converts")
}

/// Helper to create an [`UpstreamPolicy`]
pub fn upstream_policy(namespace: &str, name: &str, pod_selector_json: &str) -> UpstreamPolicy {
    UpstreamPolicy {
        key: ObjectKey::new(namespace, name),
        document: network_policy(namespace, name, pod_selector_json),
    }
}

/// Helper to create a watched NetworkPolicy as the kube watcher delivers it
pub fn dynamic_policy(namespace: &str, name: &str, pod_selector: serde_json::Value) -> DynamicObject {
    let resource = ApiResource::erase::<NetworkPolicy>(&());
    DynamicObject::new(name, &resource)
        .within(namespace)
        .data(serde_json::json!({"spec": {"podSelector": pod_selector}}))
}

/// Helper to create a reconciler over a mock Calico client
pub fn create_test_reconciler(mock: MockCalicoClient) -> Reconciler {
    Reconciler::new(Box::new(mock), Arc::new(template()), TEST_REQUEST_TIMEOUT)
}
