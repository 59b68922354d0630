//! # kubeseal-backuper
//!
//! Backs up and rotates the key of a Bitnami sealed-secrets controller.
//!
//! ## Overview
//!
//! A run:
//!
//! 1. **Finds the active key** - lists the secrets labeled
//!    `sealedsecrets.bitnami.com/sealed-secrets-key` and picks the one matching the
//!    configured name prefix
//! 2. **Backs it up** - strips cluster-assigned metadata and uploads the secret as YAML
//!    to `s3://<bucket>/<namespace>/<controllerName>-key.yaml`
//! 3. **Demotes stale keys** - relabels every key except the most recently created one
//!    as `compromised`
//! 4. **Restarts the controller** - deletes its pods so it picks up the new key state
//! 5. **Notifies** - posts a summary to Slack (or the log)
//!
//! The upload always completes before the cluster is changed. `backup` runs stop
//! after step 2 and notify; `export` writes the YAML locally and touches nothing.

pub mod backup;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod model;
pub mod notifier;
pub mod runtime;
pub mod sanitizer;
pub mod selector;
