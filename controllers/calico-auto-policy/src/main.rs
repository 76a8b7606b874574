//! Calico Auto-Policy Controller
//!
//! Mirrors every Kubernetes `NetworkPolicy` into a Calico policy built from a
//! template, with the template's `spec.selector` replaced by the translation
//! of the upstream `podSelector`.
//!
//! This lets Calico-specific rules (ordering, actions, global selectors) be
//! applied to exactly the pods a plain NetworkPolicy selects.

mod config;
mod controller;
mod error;
mod events;
mod materializer;
mod reconciler;
mod template;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::controller::Controller;
use crate::error::ControllerError;
use crate::template::PolicyTemplate;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Err only when a provider is already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Calico auto-policy controller");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Template: {}", config.template_path.display());
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Resync period: {:?}", config.resync_period);
    info!("  Request timeout: {:?}", config.request_timeout);

    let template = PolicyTemplate::load(&config.template_path)?;

    // Initialize and run controller
    let controller = Controller::new(&config, template).await?;
    controller.run().await?;

    info!("Calico auto-policy controller stopped");
    Ok(())
}
