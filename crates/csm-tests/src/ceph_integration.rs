//! Ceph upgrade flow through `CephCli` with scripted `ceph` and `podman`.

use crate::harness::{daemons, Reply, ScriptedRunner};
use csm_ceph::{CephCli, CephError, DaemonType, MonitorOutcome, MonitorTimings, Upgrade, UpgradeState};
use std::sync::Arc;

const CONF: &str = "/etc/ceph/ceph.conf";
const IMAGE: &str = "registry.local/artifactory.algol60.net/csm-docker/stable/quay.io/ceph/ceph:v17.2.6";

const IDLE: &str = r#"{"target_image": null, "in_progress": false, "services_complete": ["mgr", "mon", "osd", "rgw", "crash"], "message": ""}"#;
const BUSY: &str = r#"{"target_image": "registry.local/artifactory.algol60.net/csm-docker/stable/quay.io/ceph/ceph:v17.2.6", "in_progress": true, "services_complete": ["mgr"], "message": "Currently upgrading osd daemons"}"#;
const PULL_FAILED: &str = r#"{"target_image": "registry.local/artifactory.algol60.net/csm-docker/stable/quay.io/ceph/ceph:v17.2.6", "in_progress": true, "services_complete": [], "message": "Error: UPGRADE_FAILED_PULL: Upgrade: failed to pull target image"}"#;

fn ceph(args: &[&'static str]) -> Vec<&'static str> {
    let mut full = vec!["ceph", "--conf", CONF];
    full.extend_from_slice(args);
    full
}

fn cluster_script(status: Vec<Reply>, daemon_output: String) -> ScriptedRunner {
    let mut runner = ScriptedRunner::new()
        .reply(
            &ceph(&["version"]),
            r#"{"version": "ceph version 16.2.13 (5378749ba6be3a0868b51803968ee9cde4833a3e) pacific (stable)"}"#,
        )
        .reply(&["podman", "pull"], "Writing manifest to image destination")
        .reply(&ceph(&["orch", "upgrade", "start"]), format!("Initiating upgrade to {}", IMAGE))
        .on(&ceph(&["orch", "upgrade", "status"]), status);
    for daemon_type in DaemonType::TRACKED {
        runner = runner.reply(
            &ceph(&["orch", "ps", "--daemon_type", daemon_type.as_str()]),
            daemon_output.clone(),
        );
    }
    runner
}

async fn start(runner: Arc<ScriptedRunner>) -> Upgrade {
    let cluster = Arc::new(CephCli::new(runner.clone(), CONF));
    let mut upgrade = Upgrade::new(cluster, runner, "v17.2.6", "registry.local")
        .await
        .unwrap();
    upgrade.initiate_upgrade().await.unwrap();
    upgrade
}

#[tokio::test]
async fn test_upgrade_runs_to_completion() {
    let upgraded = daemons(&[("17.2.6", "running"), ("17.2.6", "running"), ("17.2.6", "running")]);
    let runner = Arc::new(cluster_script(
        vec![Reply::ok(BUSY), Reply::ok(BUSY), Reply::ok(""), Reply::ok(IDLE)],
        upgraded,
    ));
    let mut upgrade = start(runner.clone()).await;
    assert_eq!(upgrade.starting_version().as_str(), "16.2.13");
    assert_eq!(upgrade.state(), &UpgradeState::InProgress);

    let mut tables = Vec::new();
    let outcome = upgrade
        .run_to_completion(MonitorTimings::immediate(), |table| tables.push(table.to_string()))
        .await
        .unwrap();
    assert_eq!(outcome, MonitorOutcome::Completed);
    assert_eq!(upgrade.state(), &UpgradeState::Completed);
    assert_eq!(tables.len(), 2);
    assert!(tables[0].contains("Total Upgraded"));

    assert_eq!(runner.count(&["podman", "pull", IMAGE]), 1);
    assert_eq!(
        runner.count(&ceph(&["orch", "upgrade", "start", "--image", IMAGE])),
        1
    );
}

#[tokio::test]
async fn test_transient_error_does_not_fail() {
    let upgraded = daemons(&[("17.2.6", "running")]);
    let runner = Arc::new(cluster_script(
        vec![Reply::ok(PULL_FAILED), Reply::ok(BUSY), Reply::ok(IDLE)],
        upgraded,
    ));
    let mut upgrade = start(runner).await;
    let outcome = upgrade
        .run_to_completion(MonitorTimings::immediate(), |_| {})
        .await
        .unwrap();
    assert_eq!(outcome, MonitorOutcome::Completed);
}

#[tokio::test]
async fn test_persistent_error_fails_upgrade() {
    let runner = Arc::new(cluster_script(
        vec![Reply::ok(BUSY), Reply::ok(BUSY), Reply::ok(PULL_FAILED)],
        daemons(&[("16.2.13", "running")]),
    ));
    let mut upgrade = start(runner.clone()).await;
    let (success, message) = upgrade
        .run_to_completion(MonitorTimings::immediate(), |_| {})
        .await
        .unwrap()
        .into_report();
    assert!(!success);
    assert!(message.contains("UPGRADE_FAILED_PULL"));
    assert!(matches!(upgrade.state(), UpgradeState::Failed(_)));
    assert_eq!(runner.count(&ceph(&["orch", "upgrade", "start"])), 1);
}

#[tokio::test]
async fn test_leftover_daemons_fail_upgrade() {
    let runner = Arc::new(cluster_script(
        vec![Reply::ok(IDLE)],
        daemons(&[("17.2.6", "running"), ("16.2.13", "running")]),
    ));
    let mut upgrade = start(runner).await;
    let outcome = upgrade
        .run_to_completion(MonitorTimings::immediate(), |_| {})
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MonitorOutcome::Failed("Error: not all Ceph daemons were upgraded".to_string())
    );
}

#[tokio::test]
async fn test_pull_failure_never_starts_upgrade() {
    let runner = Arc::new(
        cluster_script(vec![Reply::ok(IDLE)], daemons(&[]))
            .on(&["podman", "pull"], vec![Reply::fail(125, "Error: initializing source: manifest unknown")]),
    );
    let cluster = Arc::new(CephCli::new(runner.clone(), CONF));
    let mut upgrade = Upgrade::new(cluster, runner.clone(), "17.2.6", "registry.local")
        .await
        .unwrap();

    match upgrade.initiate_upgrade().await {
        Err(CephError::ImagePull(stderr)) => assert!(stderr.contains("manifest unknown")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(upgrade.state(), &UpgradeState::NotStarted);
    assert_eq!(runner.count(&ceph(&["orch", "upgrade", "start"])), 0);
}

#[tokio::test]
async fn test_downgrade_is_refused() {
    let runner = Arc::new(cluster_script(vec![Reply::ok(IDLE)], daemons(&[])));
    let cluster = Arc::new(CephCli::new(runner.clone(), CONF));
    let mut upgrade = Upgrade::new(cluster, runner.clone(), "16.2.9", "localhost")
        .await
        .unwrap();
    let err = upgrade.initiate_upgrade().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot upgrade Ceph. The upgrade version:16.2.9 is not greater than the current Ceph version running:16.2.13."
    );
    assert_eq!(runner.count(&["podman"]), 0);
}
