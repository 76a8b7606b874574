//! Main controller implementation.
//!
//! Wires the NetworkPolicy watcher to the reconciler and runs the event loop
//! until a shutdown signal arrives.

use crate::config::Config;
use crate::error::ControllerError;
use crate::events::PolicyEvent;
use crate::reconciler::Reconciler;
use crate::template::PolicyTemplate;
use crate::watcher::{EventResult, policy_events};
use calico_client::CalicoClient;
use futures::{Stream, StreamExt};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject};
use kube::{Api, Client};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Main controller for NetworkPolicy mirroring.
pub struct Controller {
    reconciler: Reconciler,
    upstream_api: Api<DynamicObject>,
    resync_period: Duration,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Connects to the cluster, checks that NetworkPolicies can be listed and
    /// resolves the downstream kind named by the template.
    pub async fn new(config: &Config, template: PolicyTemplate) -> Result<Self, ControllerError> {
        info!("Initializing Calico auto-policy controller");

        let kube_client = Client::try_default().await?;

        let resource = ApiResource::erase::<NetworkPolicy>(&());
        let upstream_api: Api<DynamicObject> = match config.namespace.as_deref() {
            Some(namespace) => Api::namespaced_with(kube_client.clone(), namespace, &resource),
            None => Api::all_with(kube_client.clone(), &resource),
        };

        // Fail fast on missing RBAC rather than inside the watch backoff
        upstream_api
            .list(&ListParams::default().limit(1))
            .await
            .inspect_err(|e| error!("Cannot list NetworkPolicies: {}", e))?;

        let calico_client = CalicoClient::discover(kube_client, template.gvk()).await?;
        info!(
            "Mirroring into {}/{} {}",
            calico_client.resource().group,
            calico_client.resource().version,
            calico_client.resource().plural
        );

        let reconciler = Reconciler::new(
            Box::new(calico_client),
            Arc::new(template),
            config.request_timeout,
        );

        Ok(Self {
            reconciler,
            upstream_api,
            resync_period: config.resync_period,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Calico auto-policy controller running");
        let events = policy_events(self.upstream_api, self.resync_period);
        run_events(&self.reconciler, events, shutdown_signal()).await
    }
}

/// Processes events one at a time until `shutdown` resolves.
///
/// Shutdown is only observed between events, so an in-flight event always
/// finishes. The end of the event stream is an error.
pub async fn run_events<S, F>(reconciler: &Reconciler, events: S, shutdown: F) -> Result<(), ControllerError>
where
    S: Stream<Item = EventResult>,
    F: Future<Output = ()>,
{
    let mut events = pin!(events);
    let mut shutdown = pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("Shutdown requested, stopping event loop");
                return Ok(());
            }
            next = events.next() => match next {
                Some(Ok(event)) => handle_event(reconciler, &event).await,
                Some(Err(e)) => warn!("NetworkPolicy watch: {}", e),
                None => return Err(ControllerError::Watch("NetworkPolicy event stream ended".to_string())),
            },
        }
    }
}

async fn handle_event(reconciler: &Reconciler, event: &PolicyEvent) {
    info!("NetworkPolicy {}: {}", event.verb(), event.key());
    match reconciler.reconcile(event).await {
        Ok(()) => {}
        Err(e @ (ControllerError::Materialize(_) | ControllerError::Document(_))) => {
            warn!("Dropping {} event for {}: {}", event.verb(), event.key(), e);
        }
        Err(e) => error!("Failed to reconcile NetworkPolicy {}: {}", event.key(), e),
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
