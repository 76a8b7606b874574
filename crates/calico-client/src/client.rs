//! kube-backed Calico client

use crate::calico_trait::CalicoClientTrait;
use crate::error::CalicoError;
use crate::models::{ObjectKey, Operation};
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::discovery::{self, Scope};
use kube::Client;
use policy_document::Document;
use tracing::debug;

/// Writes Calico policy objects through the Kubernetes API.
#[derive(Clone)]
pub struct CalicoClient {
    client: Client,
    resource: ApiResource,
}

impl std::fmt::Debug for CalicoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalicoClient")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl CalicoClient {
    /// Creates a client for an already-resolved resource.
    #[must_use]
    pub fn new(client: Client, resource: ApiResource) -> Self {
        Self { client, resource }
    }

    /// Resolves `gvk` against the API server's discovery data.
    ///
    /// Fails when the kind is not served or is cluster-scoped.
    pub async fn discover(client: Client, gvk: &GroupVersionKind) -> Result<Self, CalicoError> {
        let (resource, capabilities) = discovery::pinned_kind(&client, gvk).await?;
        if !matches!(capabilities.scope, Scope::Namespaced) {
            return Err(CalicoError::NotNamespaced(format!(
                "{}/{} {}",
                gvk.group, gvk.version, gvk.kind
            )));
        }
        debug!(
            "Resolved {}/{} {} to plural {}",
            resource.group, resource.version, resource.kind, resource.plural
        );
        Ok(Self::new(client, resource))
    }

    /// The resolved downstream resource.
    #[must_use]
    pub fn resource(&self) -> &ApiResource {
        &self.resource
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }
}

fn to_object(policy: &Document) -> Result<DynamicObject, CalicoError> {
    Ok(serde_json::from_value(policy.to_json())?)
}

#[async_trait::async_trait]
impl CalicoClientTrait for CalicoClient {
    async fn create_policy(&self, policy: &Document) -> Result<(), CalicoError> {
        let key = ObjectKey::from_document(policy)?;
        let object = to_object(policy)?;
        self.api(&key.namespace)
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| CalicoError::from_kube(e, Operation::Create, &key))?;
        debug!("Created policy {}", key);
        Ok(())
    }

    async fn replace_policy(&self, policy: &Document) -> Result<(), CalicoError> {
        let key = ObjectKey::from_document(policy)?;
        let mut object = to_object(policy)?;
        let api = self.api(&key.namespace);

        // A PUT must carry the current resourceVersion
        let current = api
            .get(&key.name)
            .await
            .map_err(|e| CalicoError::from_kube(e, Operation::Replace, &key))?;
        object.metadata.resource_version = current.metadata.resource_version;

        api.replace(&key.name, &PostParams::default(), &object)
            .await
            .map_err(|e| CalicoError::from_kube(e, Operation::Replace, &key))?;
        debug!("Replaced policy {}", key);
        Ok(())
    }

    async fn delete_policy(&self, key: &ObjectKey) -> Result<(), CalicoError> {
        self.api(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await
            .map_err(|e| CalicoError::from_kube(e, Operation::Delete, key))?;
        debug!("Deleted policy {}", key);
        Ok(())
    }
}
