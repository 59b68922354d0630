//! State machine tests against mocked collaborators.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::backup::{BackupWriter, MockObjectStore};
use crate::cluster::{ClusterClient, MockClusterClient};
use crate::config::{ControllerSettings, FailurePolicies, FailurePolicy, RunMode, SelectionMode};
use crate::constants::{COMPROMISED_LABEL_VALUE, SEALING_KEY_LABEL};
use crate::error::{RotationError, TransportError};
use crate::model::{PodRef, SealedKeySecret};
use crate::notifier::{MockNotifier, NotificationColor};

const NAMESPACE: &str = "kubeseal";
const BUCKET: &str = "kubeseal-key-backups";

fn key(name: &str, created_at: i64) -> SealedKeySecret {
    SealedKeySecret::new(NAMESPACE, name)
        .with_creation_timestamp(Utc.timestamp_opt(created_at, 0).unwrap())
        .with_label(SEALING_KEY_LABEL, "active")
        .with_data("tls.crt", b"cert".to_vec())
        .with_data("tls.key", b"key".to_vec())
}

fn context(policies: FailurePolicies) -> RotationContext {
    RotationContext {
        controller: ControllerSettings {
            name: "kubeseal-controller".to_string(),
            namespace: NAMESPACE.to_string(),
            instance: "kubeseal".to_string(),
            key_prefix: "sealed-secrets-key".to_string(),
            selection: SelectionMode::Scan,
        },
        policies,
        channel: "#ops".to_string(),
        run_timeout: Duration::from_secs(300),
    }
}

fn controller(
    context: RotationContext,
    cluster: MockClusterClient,
    store: MockObjectStore,
    notifier: MockNotifier,
) -> RotationController {
    RotationController::new(
        context,
        Arc::new(cluster),
        BackupWriter::new(Arc::new(store), BUCKET),
        Arc::new(notifier),
    )
}

fn uploading_store() -> MockObjectStore {
    let mut store = MockObjectStore::new();
    store
        .expect_upload()
        .withf(|bucket, key, _| bucket == BUCKET && key == "kubeseal/kubeseal-controller-key.yaml")
        .times(1)
        .returning(|_, _, _| Ok(()));
    store
}

fn notifier_expecting(color: NotificationColor) -> MockNotifier {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_send()
        .withf(move |n| n.color == color && n.channel == "#ops")
        .times(1)
        .returning(|_| Ok(()));
    notifier
}

fn with_secrets(cluster: &mut MockClusterClient, secrets: Vec<SealedKeySecret>, reads: usize) {
    cluster
        .expect_list_secrets()
        .withf(|ns, selector| ns == NAMESPACE && selector == SEALING_KEY_LABEL)
        .times(reads)
        .returning(move |_, _| Ok(secrets.clone()));
}

fn with_pods(cluster: &mut MockClusterClient, pods: &[&str]) {
    let pods: Vec<PodRef> = pods.iter().map(|p| PodRef::new(NAMESPACE, *p)).collect();
    cluster
        .expect_list_pods()
        .withf(|ns, selector| ns == NAMESPACE && selector == "app.kubernetes.io/instance=kubeseal")
        .times(1)
        .returning(move |_, _| Ok(pods.clone()));
}

fn transport_error(operation: &'static str, resource: &str) -> TransportError {
    TransportError::new(operation, resource, "connection reset by peer")
}

#[tokio::test]
async fn test_full_rotation_demotes_all_but_latest() {
    let mut cluster = MockClusterClient::new();
    with_secrets(
        &mut cluster,
        vec![key("sealed-secrets-key-abc", 100), key("sealed-secrets-key-def", 200)],
        2,
    );
    cluster
        .expect_update_secret()
        .withf(|s| {
            s.name == "sealed-secrets-key-abc"
                && s.labels.get(SEALING_KEY_LABEL).map(String::as_str) == Some(COMPROMISED_LABEL_VALUE)
        })
        .times(1)
        .returning(|_| Ok(()));
    with_pods(&mut cluster, &["kubeseal-7d9f8c-x2x4z"]);
    cluster
        .expect_delete_pod()
        .withf(|ns, name| ns == NAMESPACE && name == "kubeseal-7d9f8c-x2x4z")
        .times(1)
        .returning(|_, _| Ok(()));

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Good),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    assert!(outcome.is_done(), "unexpected failure: {:?}", outcome.error());
    assert_eq!(outcome.step, RotationStep::Done);
    assert_eq!(outcome.active_key.as_deref(), Some("sealed-secrets-key-abc"));
    assert_eq!(outcome.latest_key.as_deref(), Some("sealed-secrets-key-def"));
    assert_eq!(outcome.demoted, vec!["sealed-secrets-key-abc".to_string()]);
    assert_eq!(
        outcome.restarted_pods,
        vec![PodRef::new(NAMESPACE, "kubeseal-7d9f8c-x2x4z")]
    );
    assert_eq!(
        outcome.artifact.as_ref().map(ToString::to_string).as_deref(),
        Some("s3://kubeseal-key-backups/kubeseal/kubeseal-controller-key.yaml")
    );
    assert_eq!(outcome.notification, NotificationStatus::Sent);
    assert!(outcome.partial_demotion().is_none());
}

#[tokio::test]
async fn test_already_compromised_key_is_relabeled() {
    let retired = key("sealed-secrets-key-old", 50).with_label(SEALING_KEY_LABEL, COMPROMISED_LABEL_VALUE);
    assert!(retired.is_compromised());

    let mut cluster = MockClusterClient::new();
    with_secrets(
        &mut cluster,
        vec![
            key("sealed-secrets-key-abc", 100),
            retired,
            key("sealed-secrets-key-def", 200),
        ],
        2,
    );
    cluster
        .expect_update_secret()
        .withf(|s| s.is_compromised() && s.name != "sealed-secrets-key-def")
        .times(2)
        .returning(|_| Ok(()));
    with_pods(&mut cluster, &["kubeseal-7d9f8c-x2x4z"]);
    cluster.expect_delete_pod().times(1).returning(|_, _| Ok(()));

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Good),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    assert!(outcome.is_done(), "unexpected failure: {:?}", outcome.error());
    assert_eq!(
        outcome.demoted,
        vec![
            "sealed-secrets-key-abc".to_string(),
            "sealed-secrets-key-old".to_string()
        ]
    );
}

#[tokio::test]
async fn test_backup_failure_prevents_any_mutation() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 1);
    cluster.expect_update_secret().never();
    cluster.expect_list_pods().never();
    cluster.expect_delete_pod().never();

    let mut store = MockObjectStore::new();
    store
        .expect_upload()
        .times(1)
        .returning(|bucket, key, _| Err(transport_error("upload", &format!("s3://{bucket}/{key}"))));

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        store,
        notifier_expecting(NotificationColor::Danger),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::BackingUp);
    assert_eq!(err.reason(), "transport");
    assert!(outcome.artifact.is_none());
    assert!(outcome.demoted.is_empty());
}

#[tokio::test]
async fn test_demotion_failure_continues_to_restart() {
    let mut cluster = MockClusterClient::new();
    with_secrets(
        &mut cluster,
        vec![
            key("sealed-secrets-key-a", 100),
            key("sealed-secrets-key-b", 200),
            key("sealed-secrets-key-c", 300),
            key("sealed-secrets-key-d", 400),
        ],
        2,
    );
    cluster.expect_update_secret().times(3).returning(|s| {
        if s.name == "sealed-secrets-key-b" {
            Err(transport_error("update secret", &s.to_string()))
        } else {
            Ok(())
        }
    });
    with_pods(&mut cluster, &["kubeseal-7d9f8c-x2x4z"]);
    cluster.expect_delete_pod().times(1).returning(|_, _| Ok(()));

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Warning),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    assert!(outcome.is_done());
    assert_eq!(outcome.latest_key.as_deref(), Some("sealed-secrets-key-d"));
    assert_eq!(
        outcome.demoted,
        vec!["sealed-secrets-key-a".to_string(), "sealed-secrets-key-c".to_string()]
    );
    assert_eq!(outcome.demotion_failures.len(), 1);
    assert_eq!(outcome.demotion_failures[0].target, "kubeseal/sealed-secrets-key-b");
    assert_eq!(outcome.restarted_pods.len(), 1);
    assert!(matches!(
        outcome.partial_demotion(),
        Some(RotationError::PartialDemotion {
            failed: 1,
            attempted: 3,
            ..
        })
    ));
}

#[tokio::test]
async fn test_demotion_abort_policy_stops_at_first_failure() {
    let mut cluster = MockClusterClient::new();
    with_secrets(
        &mut cluster,
        vec![
            key("sealed-secrets-key-a", 100),
            key("sealed-secrets-key-b", 200),
            key("sealed-secrets-key-c", 300),
        ],
        2,
    );
    cluster
        .expect_update_secret()
        .times(1)
        .returning(|s| Err(transport_error("update secret", &s.to_string())));
    cluster.expect_list_pods().never();
    cluster.expect_delete_pod().never();

    let policies = FailurePolicies {
        demotion: FailurePolicy::Abort,
        ..FailurePolicies::default()
    };
    let controller = controller(
        context(policies),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Danger),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::Demoting);
    assert!(outcome.artifact.is_some());
}

#[tokio::test]
async fn test_restart_failure_aborts_by_default() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 2);
    cluster.expect_update_secret().never();
    with_pods(&mut cluster, &["kubeseal-0", "kubeseal-1"]);
    cluster
        .expect_delete_pod()
        .times(1)
        .returning(|ns, name| Err(transport_error("delete pod", &format!("{ns}/{name}"))));

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Danger),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::Restarting);
    assert!(outcome.restarted_pods.is_empty());
}

#[tokio::test]
async fn test_restart_continue_policy_tries_every_pod() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 2);
    with_pods(&mut cluster, &["kubeseal-0", "kubeseal-1"]);
    cluster.expect_delete_pod().times(2).returning(|ns, name| {
        if name == "kubeseal-0" {
            Err(transport_error("delete pod", &format!("{ns}/{name}")))
        } else {
            Ok(())
        }
    });

    let policies = FailurePolicies {
        restart: FailurePolicy::Continue,
        ..FailurePolicies::default()
    };
    let controller = controller(
        context(policies),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Warning),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    assert!(outcome.is_done());
    assert_eq!(outcome.restarted_pods, vec![PodRef::new(NAMESPACE, "kubeseal-1")]);
    assert_eq!(outcome.restart_failures[0].target, "kubeseal/kubeseal-0");
}

#[tokio::test]
async fn test_no_controller_pods_is_fatal() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 2);
    with_pods(&mut cluster, &[]);
    cluster.expect_delete_pod().never();

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Danger),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::Restarting);
    assert_eq!(err.reason(), "not_found");
}

#[tokio::test]
async fn test_backup_mode_never_mutates_the_cluster() {
    let mut cluster = MockClusterClient::new();
    with_secrets(
        &mut cluster,
        vec![key("sealed-secrets-key-abc", 100), key("sealed-secrets-key-def", 200)],
        1,
    );
    cluster.expect_update_secret().never();
    cluster.expect_list_pods().never();
    cluster.expect_delete_pod().never();

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier_expecting(NotificationColor::Good),
    );
    let outcome = controller.run(RunMode::Backup).await;

    assert!(outcome.is_done());
    assert!(outcome.latest_key.is_none());
    assert!(outcome.demoted.is_empty());
}

#[tokio::test]
async fn test_no_key_secrets_fails_fetching() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, Vec::new(), 1);

    let mut store = MockObjectStore::new();
    store.expect_upload().never();

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        store,
        notifier_expecting(NotificationColor::Danger),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::Fetching);
    assert_eq!(err.reason(), "not_found");
}

#[tokio::test]
async fn test_first_element_mode_rejects_later_match() {
    let secrets = vec![key("other-key", 100), key("sealed-secrets-key-abc", 200)];

    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, secrets, 1);
    let mut store = MockObjectStore::new();
    store.expect_upload().never();

    let mut ctx = context(FailurePolicies::default());
    ctx.controller.selection = SelectionMode::FirstElement;
    let controller = controller(ctx, cluster, store, notifier_expecting(NotificationColor::Danger));
    let outcome = controller.run(RunMode::Backup).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::Selecting);
}

#[tokio::test]
async fn test_notification_failure_aborts_by_default() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 1);

    let mut notifier = MockNotifier::new();
    // Only the summary; no second failure report through the broken notifier
    notifier
        .expect_send()
        .times(1)
        .returning(|n| Err(transport_error("post message", &n.channel)));

    let controller = controller(
        context(FailurePolicies::default()),
        cluster,
        uploading_store(),
        notifier,
    );
    let outcome = controller.run(RunMode::Backup).await;

    let err = outcome.error().expect("run should fail");
    assert_eq!(err.step(), RotationStep::Notifying);
    assert!(matches!(outcome.notification, NotificationStatus::Failed(_)));
}

#[tokio::test]
async fn test_notification_continue_policy_finishes_run() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 1);

    let mut notifier = MockNotifier::new();
    notifier
        .expect_send()
        .times(1)
        .returning(|n| Err(transport_error("post message", &n.channel)));

    let policies = FailurePolicies {
        notification: FailurePolicy::Continue,
        ..FailurePolicies::default()
    };
    let controller = controller(context(policies), cluster, uploading_store(), notifier);
    let outcome = controller.run(RunMode::Backup).await;

    assert!(outcome.is_done());
    assert!(matches!(outcome.notification, NotificationStatus::Failed(_)));
}

/// Cluster whose list calls never answer in time
struct StalledCluster;

#[async_trait]
impl ClusterClient for StalledCluster {
    async fn list_secrets(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<SealedKeySecret>, TransportError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: &str,
    ) -> Result<Vec<PodRef>, TransportError> {
        Ok(Vec::new())
    }

    async fn update_secret(&self, _secret: &SealedKeySecret) -> Result<(), TransportError> {
        Ok(())
    }

    async fn delete_pod(&self, _namespace: &str, _name: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fails_step_in_progress() {
    let mut store = MockObjectStore::new();
    store.expect_upload().never();

    let mut ctx = context(FailurePolicies::default());
    ctx.run_timeout = Duration::from_secs(5);
    let controller = RotationController::new(
        ctx,
        Arc::new(StalledCluster),
        BackupWriter::new(Arc::new(store), BUCKET),
        Arc::new(notifier_expecting(NotificationColor::Danger)),
    );
    let outcome = controller.run(RunMode::Rotate).await;

    let err = outcome.error().expect("run should time out");
    assert!(matches!(
        err,
        RotationError::DeadlineExceeded {
            step: RotationStep::Fetching,
            timeout_secs: 5
        }
    ));
}

#[tokio::test]
async fn test_export_writes_key_without_mutation() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 1);
    cluster.expect_update_secret().never();
    cluster.expect_delete_pod().never();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("kubeseal-controller-key.yaml");
    let exported = export_key(&context(FailurePolicies::default()), &cluster, &target)
        .await
        .unwrap();

    assert_eq!(exported.secret, "sealed-secrets-key-abc");
    assert_eq!(std::fs::read(&target).unwrap(), exported.artifact);
    let yaml = String::from_utf8(exported.artifact).unwrap();
    assert!(yaml.starts_with("apiVersion: v1\n"));
    assert!(yaml.contains("name: sealed-secrets-key-abc\n"));
    assert!(!yaml.contains("resourceVersion"));
}

#[tokio::test]
async fn test_export_write_failure_is_reported() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 1);

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("key.yaml");
    let err = export_key(&context(FailurePolicies::default()), &cluster, &target)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RotationError::Serialization {
            step: RotationStep::BackingUp,
            source: crate::error::SerializationError::Io(_)
        }
    ));
}

#[tokio::test]
async fn test_export_deadline_covers_output_write() {
    let mut cluster = MockClusterClient::new();
    with_secrets(&mut cluster, vec![key("sealed-secrets-key-abc", 100)], 1);

    let mut ctx = context(FailurePolicies::default());
    ctx.run_timeout = Duration::from_millis(50);
    let err = super::export::export_with(&ctx, &cluster, |_| {
        std::thread::sleep(Duration::from_millis(500));
        Ok(())
    })
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RotationError::DeadlineExceeded {
            step: RotationStep::BackingUp,
            ..
        }
    ));
}
