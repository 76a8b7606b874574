//! Calico Client
//!
//! Namespaced create / replace / delete of Calico policy objects, keyed by
//! `(namespace, name)`. Objects are handled as [`Document`] trees and sent to
//! the API server as `DynamicObject`s, so any Calico kind served by the
//! cluster can be targeted.
//!
//! # Example
//!
//! ```no_run
//! use calico_client::{CalicoClient, CalicoClientTrait};
//! use kube::core::GroupVersionKind;
//! use policy_document::Document;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube_client = kube::Client::try_default().await?;
//! let gvk = GroupVersionKind::gvk("projectcalico.org", "v3", "NetworkPolicy");
//! let client = CalicoClient::discover(kube_client, &gvk).await?;
//!
//! let policy = Document::from_yaml_str(
//!     "apiVersion: projectcalico.org/v3\n\
//!      kind: NetworkPolicy\n\
//!      metadata: {namespace: default, name: web}\n\
//!      spec: {selector: \"app == 'web'\"}\n",
//! )?;
//! client.create_policy(&policy).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Document`]: policy_document::Document

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod calico_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use calico_trait::CalicoClientTrait;
pub use client::CalicoClient;
pub use error::CalicoError;
pub use models::{ObjectKey, Operation};
#[cfg(feature = "test-util")]
pub use mock::MockCalicoClient;
