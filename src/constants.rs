//! # Constants
//!
//! Label keys, sentinel values and configuration defaults shared across the crate.

/// Label carried by every key secret the sealed-secrets controller generates
pub const SEALING_KEY_LABEL: &str = "sealedsecrets.bitnami.com/sealed-secrets-key";

/// Label value that retires a key: the controller stops treating it as active
pub const COMPROMISED_LABEL_VALUE: &str = "compromised";

/// Pod label used to find the controller's pods
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

/// API version restored onto exported secrets
pub const SECRET_API_VERSION: &str = "v1";

/// Kind restored onto exported secrets
pub const SECRET_KIND: &str = "Secret";

/// Field manager name used for label patches
pub const FIELD_MANAGER: &str = "kubeseal-backuper";

// Configuration defaults
pub const DEFAULT_CONTROLLER_NAME: &str = "kubeseal-controller";
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "kubeseal";
pub const DEFAULT_CONTROLLER_INSTANCE: &str = "kubeseal";
pub const DEFAULT_KEY_PREFIX: &str = "sealed-secrets-key";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

/// Timeout applied to each Slack API request
pub const SLACK_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Content type of uploaded backup artifacts
pub const ARTIFACT_CONTENT_TYPE: &str = "application/yaml";
