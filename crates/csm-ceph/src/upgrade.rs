//! Starting an orchestrator upgrade and following it to a terminal state.

use crate::cluster::{ceph_version, CephCluster};
use crate::command::CephCommand;
use crate::error::{CephError, Result};
use crate::monitor::{MonitorOutcome, MonitorTimings, UpgradeMonitor};
use crate::registry::Registry;
use crate::version::CephVersion;
use comfy_table::Table;
use csm_common::CommandRunner;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeState {
    NotStarted,
    InProgress,
    Completed,
    Failed(String),
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeState::NotStarted => f.write_str("not started"),
            UpgradeState::InProgress => f.write_str("in progress"),
            UpgradeState::Completed => f.write_str("completed"),
            UpgradeState::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

pub struct Upgrade {
    cluster: Arc<dyn CephCluster>,
    images: Arc<dyn CommandRunner>,
    starting_version: CephVersion,
    upgrade_version: CephVersion,
    registry: Registry,
    state: UpgradeState,
}

impl Upgrade {
    /// Reads the running version from the cluster and validates the requested
    /// target version and registry. `images` runs `podman`.
    pub async fn new(
        cluster: Arc<dyn CephCluster>,
        images: Arc<dyn CommandRunner>,
        version: &str,
        registry: &str,
    ) -> Result<Self> {
        let running = ceph_version(cluster.as_ref()).await?;
        let starting_version = CephVersion::parse_reported(&running)?;
        let upgrade_version = CephVersion::parse(version)?;
        let registry: Registry = registry.parse()?;
        info!(
            "Current Ceph version is {}, requested upgrade to {} from {}",
            starting_version, upgrade_version, registry
        );
        Ok(Self {
            cluster,
            images,
            starting_version,
            upgrade_version,
            registry,
            state: UpgradeState::NotStarted,
        })
    }

    pub fn starting_version(&self) -> &CephVersion {
        &self.starting_version
    }

    pub fn upgrade_version(&self) -> &CephVersion {
        &self.upgrade_version
    }

    pub fn registry(&self) -> Registry {
        self.registry
    }

    pub fn state(&self) -> &UpgradeState {
        &self.state
    }

    pub fn upgrade_image(&self) -> String {
        self.registry.ceph_image(self.upgrade_version.as_str())
    }

    pub fn verify_upgrade_version(&self) -> Result<()> {
        if self.upgrade_version > self.starting_version {
            return Ok(());
        }
        Err(CephError::VersionNotGreater {
            upgrade: self.upgrade_version.to_string(),
            current: self.starting_version.to_string(),
        })
    }

    pub async fn check_image_pull(&self) -> Result<()> {
        let image = self.upgrade_image();
        let out = self.images.run(&["podman", "pull", &image]).await;
        if out.success() {
            info!("Pulled {}", image);
            return Ok(());
        }
        Err(CephError::ImagePull(out.stderr))
    }

    /// Validates the target and issues `ceph orch upgrade start`. Only valid
    /// once; the command is never retried.
    pub async fn initiate_upgrade(&mut self) -> Result<()> {
        if self.state != UpgradeState::NotStarted {
            return Err(CephError::WrongState(self.state.to_string()));
        }
        self.verify_upgrade_version()?;
        self.check_image_pull().await?;

        let image = self.upgrade_image();
        let out = self
            .cluster
            .run(&CephCommand::UpgradeStart { image: image.clone() })
            .await?;
        info!("Upgrade to {} started: {}", image, out.trim());
        self.state = UpgradeState::InProgress;
        Ok(())
    }

    pub fn monitor(&self, timings: MonitorTimings) -> UpgradeMonitor {
        UpgradeMonitor::new(
            self.cluster.clone(),
            self.starting_version.as_str(),
            self.upgrade_version.as_str(),
        )
        .with_timings(timings)
    }

    /// Polls an initiated upgrade until it completes or fails and records the
    /// terminal state.
    pub async fn run_to_completion<F>(
        &mut self,
        timings: MonitorTimings,
        report: F,
    ) -> Result<MonitorOutcome>
    where
        F: FnMut(&Table),
    {
        if self.state != UpgradeState::InProgress {
            return Err(CephError::WrongState(self.state.to_string()));
        }
        let outcome = self.monitor(timings).monitor_upgrade(report).await?;
        self.state = match &outcome {
            MonitorOutcome::Completed => UpgradeState::Completed,
            MonitorOutcome::Failed(msg) => {
                error!("Ceph upgrade failed: {}", msg);
                UpgradeState::Failed(msg.clone())
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use csm_common::CommandOutput;
    use std::sync::Mutex;

    struct FakeCluster {
        version: String,
        status: String,
        daemons: String,
        commands: Mutex<Vec<CephCommand>>,
    }

    impl FakeCluster {
        fn new(version: &str) -> Self {
            Self {
                version: version.to_string(),
                status: r#"{"target_image": null, "in_progress": false, "services_complete": [], "message": ""}"#.to_string(),
                daemons: "[]".to_string(),
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CephCluster for FakeCluster {
        async fn run(&self, command: &CephCommand) -> Result<String> {
            self.commands.lock().unwrap().push(command.clone());
            Ok(match command {
                CephCommand::Version => format!(
                    r#"{{"version": "ceph version {} (5378749ba6be3a0868b51803968ee9cde4833a3e) pacific (stable)"}}"#,
                    self.version
                ),
                CephCommand::UpgradeStatus => self.status.clone(),
                CephCommand::OrchPs { .. } => self.daemons.clone(),
                CephCommand::UpgradeStart { image } => format!("Initiating upgrade to {}", image),
            })
        }
    }

    struct Podman {
        code: i32,
        pulled: Mutex<Vec<String>>,
    }

    impl Podman {
        fn new(code: i32) -> Arc<Self> {
            Arc::new(Self { code, pulled: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl CommandRunner for Podman {
        async fn run(&self, args: &[&str]) -> CommandOutput {
            self.pulled.lock().unwrap().push(args.join(" "));
            CommandOutput::new(args, "", "Error: initializing source: manifest unknown", self.code)
        }
    }

    async fn upgrade(current: &str, target: &str, podman: Arc<Podman>) -> (Arc<FakeCluster>, Upgrade) {
        let cluster = Arc::new(FakeCluster::new(current));
        let up = Upgrade::new(cluster.clone(), podman, target, "registry.local")
            .await
            .unwrap();
        (cluster, up)
    }

    #[tokio::test]
    async fn test_new_reads_running_version() {
        let (_, up) = upgrade("16.2.13", "v17.2.6", Podman::new(0)).await;
        assert_eq!(up.starting_version().as_str(), "16.2.13");
        assert_eq!(up.upgrade_version().as_str(), "17.2.6");
        assert_eq!(up.state(), &UpgradeState::NotStarted);
        assert_eq!(
            up.upgrade_image(),
            "registry.local/artifactory.algol60.net/csm-docker/stable/quay.io/ceph/ceph:v17.2.6"
        );
    }

    #[tokio::test]
    async fn test_new_rejects_bad_input() {
        let cluster = Arc::new(FakeCluster::new("16.2.13"));
        let err = Upgrade::new(cluster.clone(), Podman::new(0), "17.2", "registry.local").await;
        assert!(matches!(err, Err(CephError::InvalidVersion(_))));
        let err = Upgrade::new(cluster, Podman::new(0), "17.2.6", "docker.io").await;
        assert!(matches!(err, Err(CephError::InvalidRegistry(_))));
    }

    #[tokio::test]
    async fn test_initiate_requires_newer_version() {
        let podman = Podman::new(0);
        let (cluster, mut up) = upgrade("17.2.6", "17.2.6", podman.clone()).await;
        assert!(matches!(
            up.initiate_upgrade().await,
            Err(CephError::VersionNotGreater { .. })
        ));
        assert_eq!(up.state(), &UpgradeState::NotStarted);
        assert!(podman.pulled.lock().unwrap().is_empty());
        assert!(!cluster
            .commands
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, CephCommand::UpgradeStart { .. })));
    }

    #[tokio::test]
    async fn test_initiate_reports_pull_failure() {
        let (_, mut up) = upgrade("16.2.13", "17.2.6", Podman::new(125)).await;
        match up.initiate_upgrade().await {
            Err(CephError::ImagePull(stderr)) => assert!(stderr.contains("manifest unknown")),
            other => panic!("unexpected {:?}", other.err()),
        }
        assert_eq!(up.state(), &UpgradeState::NotStarted);
    }

    #[tokio::test]
    async fn test_initiate_starts_once() {
        let podman = Podman::new(0);
        let (cluster, mut up) = upgrade("16.2.13", "17.2.6", podman.clone()).await;
        up.initiate_upgrade().await.unwrap();
        assert_eq!(up.state(), &UpgradeState::InProgress);
        assert_eq!(
            podman.pulled.lock().unwrap()[0],
            format!("podman pull {}", up.upgrade_image())
        );
        assert!(cluster
            .commands
            .lock()
            .unwrap()
            .contains(&CephCommand::UpgradeStart { image: up.upgrade_image() }));

        assert!(matches!(up.initiate_upgrade().await, Err(CephError::WrongState(_))));
    }

    #[tokio::test]
    async fn test_run_to_completion_records_state() {
        let (_, mut up) = upgrade("16.2.13", "17.2.6", Podman::new(0)).await;
        assert!(matches!(
            up.run_to_completion(MonitorTimings::immediate(), |_| {}).await,
            Err(CephError::WrongState(_))
        ));

        up.initiate_upgrade().await.unwrap();
        let outcome = up
            .run_to_completion(MonitorTimings::immediate(), |_| {})
            .await
            .unwrap();
        assert_eq!(outcome, MonitorOutcome::Completed);
        assert_eq!(up.state(), &UpgradeState::Completed);
    }
}
