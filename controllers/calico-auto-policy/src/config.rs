//! Controller configuration from environment variables.

use crate::error::ControllerError;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the mounted policy template
pub const DEFAULT_TEMPLATE_PATH: &str = "/etc/calico-auto-policy/policy.yaml";
const DEFAULT_RESYNC_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration.
///
/// Cluster credentials are not part of it: `KUBECONFIG` or the in-cluster
/// service account are picked up by kube's own config inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `CALICO_AUTO_POLICY_TEMPLATE`
    pub template_path: PathBuf,
    /// `CALICO_AUTO_POLICY_RESYNC_SECS`
    pub resync_period: Duration,
    /// `CALICO_AUTO_POLICY_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,
    /// `WATCH_NAMESPACE`; `None` watches all namespaces
    pub namespace: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            template_path: get("CALICO_AUTO_POLICY_TEMPLATE")
                .map_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH), PathBuf::from),
            resync_period: seconds(
                "CALICO_AUTO_POLICY_RESYNC_SECS",
                get("CALICO_AUTO_POLICY_RESYNC_SECS"),
                DEFAULT_RESYNC_SECS,
            )?,
            request_timeout: seconds(
                "CALICO_AUTO_POLICY_REQUEST_TIMEOUT_SECS",
                get("CALICO_AUTO_POLICY_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            namespace: get("WATCH_NAMESPACE"),
        })
    }
}

fn seconds(name: &str, value: Option<String>, default: u64) -> Result<Duration, ControllerError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default));
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ControllerError::InvalidConfig(format!("{name} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ControllerError::InvalidConfig(format!(
            "{name} must be a whole number of seconds, got {value:?}: {e}"
        ))),
    }
}
