//! # Configuration
//!
//! Run configuration loaded once from environment variables at process start.
//!
//! Nothing below `main` reads the environment: the loaded [`BackuperConfig`] is
//! passed down explicitly. A `.env` file in the working directory is honoured for
//! local runs (see [`crate::runtime::initialization`]).
//!
//! Loading goes through a lookup function so tests can supply variables without
//! touching the process environment.

mod cluster;
mod notifier;
mod policy;
mod storage;

pub use cluster::{ClusterAccessMode, ClusterConfig};
pub use notifier::NotifierConfig;
pub use policy::{FailurePolicies, FailurePolicy, SelectionMode};
pub use storage::StorageConfig;

use crate::constants::{
    DEFAULT_CONTROLLER_INSTANCE, DEFAULT_CONTROLLER_NAME, DEFAULT_CONTROLLER_NAMESPACE,
    DEFAULT_KEY_PREFIX, DEFAULT_RUN_TIMEOUT_SECS,
};
use crate::error::ConfigError;
use std::time::Duration;

/// What a run is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Back up, demote stale keys, restart the controller, notify
    Rotate,
    /// Back up and notify only; the cluster is never mutated
    Backup,
    /// Write the sanitized key locally; no upload, mutation or notification
    Export,
}

/// Sealing controller coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Controller name, used for the artifact file name
    pub name: String,
    /// Namespace holding the controller and its key secrets
    pub namespace: String,
    /// Value of the `app.kubernetes.io/instance` label on the controller pods
    pub instance: String,
    /// Name prefix of the active key secret
    pub key_prefix: String,
    pub selection: SelectionMode,
}

/// Complete, validated run configuration
#[derive(Debug, Clone)]
pub struct BackuperConfig {
    pub cluster: ClusterConfig,
    pub controller: ControllerSettings,
    /// `None` in [`RunMode::Export`]
    pub storage: Option<StorageConfig>,
    pub notifier: NotifierConfig,
    pub policies: FailurePolicies,
    /// Deadline for the whole run
    pub run_timeout: Duration,
}

impl BackuperConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for the first missing or invalid variable.
    pub fn from_env(mode: RunMode) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), mode)
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for the first missing or invalid variable.
    pub fn from_lookup<F>(lookup: F, mode: RunMode) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let cluster = ClusterConfig::load(&env)?;

        let controller = ControllerSettings {
            name: env.or_default("KUBESEAL_CONTROLLER_NAME", DEFAULT_CONTROLLER_NAME),
            namespace: env.or_default("KUBESEAL_CONTROLLER_NAMESPACE", DEFAULT_CONTROLLER_NAMESPACE),
            instance: env.or_default("KUBESEAL_CONTROLLER_INSTANCE", DEFAULT_CONTROLLER_INSTANCE),
            key_prefix: env.or_default("KUBESEAL_KEY_PREFIX", DEFAULT_KEY_PREFIX),
            selection: env.parsed_or_default("KUBESEAL_KEY_SELECTION", SelectionMode::Scan)?,
        };

        let (storage, notifier) = match mode {
            RunMode::Export => (None, NotifierConfig::None),
            RunMode::Rotate | RunMode::Backup => {
                (Some(StorageConfig::load(&env)?), NotifierConfig::load(&env)?)
            }
        };

        let policies = FailurePolicies::load(&env)?;

        let timeout_secs: u64 = env.parsed_or_default("RUN_TIMEOUT_SECS", DEFAULT_RUN_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "RUN_TIMEOUT_SECS",
                value: "0".to_string(),
                expected: "a positive number of seconds",
            });
        }

        Ok(Self {
            cluster,
            controller,
            storage,
            notifier,
            policies,
            run_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Thin wrapper over the lookup with the parsing helpers every section uses
pub(crate) struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Value of `key`; empty strings count as unset
    pub(crate) fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing { key })
    }

    pub(crate) fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub(crate) fn parsed_or_default<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: ExpectedValues,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                expected: e.expected(),
                value: raw,
            }),
        }
    }
}

/// Parse errors that can describe the accepted values
pub(crate) trait ExpectedValues {
    fn expected(&self) -> &'static str;
}

impl ExpectedValues for std::num::ParseIntError {
    fn expected(&self) -> &'static str {
        "a non-negative integer"
    }
}
