//! # Cluster Access Configuration

use super::policy::UnknownVariant;
use super::{ConfigError, Env};
use std::path::PathBuf;
use std::str::FromStr;

/// How the Kubernetes client authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAccessMode {
    /// In-cluster service account
    Internal,
    /// Kubeconfig file on disk
    External,
}

impl FromStr for ClusterAccessMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internal" => Ok(ClusterAccessMode::Internal),
            "external" => Ok(ClusterAccessMode::External),
            _ => Err(UnknownVariant("internal or external")),
        }
    }
}

/// Kubernetes access settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub mode: ClusterAccessMode,
    /// Kubeconfig path, always set in external mode
    pub kubeconfig_path: Option<PathBuf>,
}

impl ClusterConfig {
    pub(crate) fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        let mode = env.parsed_or_default("KUBERNETES_CLIENT_MODE", ClusterAccessMode::Internal)?;
        let kubeconfig_path = match mode {
            ClusterAccessMode::External => {
                Some(PathBuf::from(env.required("KUBERNETES_KUBECONFIG_PATH")?))
            }
            ClusterAccessMode::Internal => env.get("KUBERNETES_KUBECONFIG_PATH").map(PathBuf::from),
        };
        Ok(Self {
            mode,
            kubeconfig_path,
        })
    }
}
