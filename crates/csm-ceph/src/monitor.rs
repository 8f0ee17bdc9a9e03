//! Polling an in-flight orchestrator upgrade until it finishes or fails.

use crate::cluster::CephCluster;
use crate::command::{CephCommand, DaemonType};
use crate::error::{CephError, Result};
use comfy_table::Table;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Consecutive idle status polls required before the daemon census runs.
pub const COMPLETE_CHECKS: usize = 3;

/// Fixed delays used by the monitor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTimings {
    /// Wait before re-reading a status that mentioned an error.
    pub error_recheck: Duration,
    /// Wait between the idle-status polls.
    pub complete_recheck: Duration,
    /// Grace period for upgraded daemons that are not running yet.
    pub daemon_grace: Duration,
    /// Wait between monitor rounds.
    pub poll_interval: Duration,
}

impl Default for MonitorTimings {
    fn default() -> Self {
        Self {
            error_recheck: Duration::from_secs(10),
            complete_recheck: Duration::from_secs(5),
            daemon_grace: Duration::from_secs(60),
            poll_interval: Duration::from_secs(45),
        }
    }
}

impl MonitorTimings {
    /// No waiting at all.
    pub fn immediate() -> Self {
        Self {
            error_recheck: Duration::ZERO,
            complete_recheck: Duration::ZERO,
            daemon_grace: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// `ceph orch upgrade status` output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpgradeStatus {
    #[serde(default)]
    pub target_image: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub services_complete: Vec<String>,
    #[serde(default)]
    pub message: String,
}

impl UpgradeStatus {
    /// `None` for an empty reply, which the orchestrator sometimes gives
    /// between upgrade phases.
    pub fn parse(output: &str) -> Result<Option<Self>> {
        if output.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(output)
            .map(Some)
            .map_err(|source| CephError::Parse {
                command: CephCommand::UpgradeStatus.to_string(),
                source,
            })
    }

    pub fn has_error(&self) -> bool {
        self.message.to_lowercase().contains("error")
    }

    pub fn is_idle(&self) -> bool {
        !self.in_progress && self.target_image.is_none()
    }
}

/// One entry of `ceph orch ps` output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonInfo {
    #[serde(default)]
    pub daemon_type: Option<String>,
    #[serde(default)]
    pub daemon_id: Option<String>,
    #[serde(default)]
    pub status_desc: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

pub fn parse_daemons(daemon_type: DaemonType, output: &str) -> Result<Vec<DaemonInfo>> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed.starts_with("No daemons") {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|source| CephError::Parse {
        command: CephCommand::OrchPs { daemon_type }.to_string(),
        source,
    })
}

/// Daemons of one class, bucketed by version and run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaemonCount {
    pub original: usize,
    pub upgraded: usize,
    pub running: usize,
}

impl DaemonCount {
    pub fn tally(daemons: &[DaemonInfo], original: &str, upgraded: &str) -> Self {
        let mut count = DaemonCount::default();
        for daemon in daemons {
            if daemon.status_desc.as_deref() == Some("running") {
                count.running += 1;
            }
            match daemon.version.as_deref() {
                Some(v) if v == original => count.original += 1,
                Some(v) if v == upgraded => count.upgraded += 1,
                _ => {}
            }
        }
        count
    }

    /// Nothing left on the old release and every upgraded daemon is running.
    pub fn is_balanced(&self) -> bool {
        self.original == 0 && self.upgraded == self.running
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Completed,
    Failed(String),
}

impl MonitorOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MonitorOutcome::Completed)
    }

    /// `(success, error message)`; the message is empty on success.
    pub fn into_report(self) -> (bool, String) {
        match self {
            MonitorOutcome::Completed => (true, String::new()),
            MonitorOutcome::Failed(msg) => (false, msg),
        }
    }
}

pub struct UpgradeMonitor {
    cluster: Arc<dyn CephCluster>,
    original: String,
    upgraded: String,
    timings: MonitorTimings,
}

impl UpgradeMonitor {
    pub fn new(
        cluster: Arc<dyn CephCluster>,
        original: impl Into<String>,
        upgraded: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            original: original.into(),
            upgraded: upgraded.into(),
            timings: MonitorTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: MonitorTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn timings(&self) -> &MonitorTimings {
        &self.timings
    }

    pub async fn upgrade_status(&self) -> Result<Option<UpgradeStatus>> {
        let output = self.cluster.run(&CephCommand::UpgradeStatus).await?;
        UpgradeStatus::parse(&output)
    }

    pub async fn count_daemons_per_version(&self, daemon_type: DaemonType) -> Result<DaemonCount> {
        let output = self.cluster.run(&CephCommand::OrchPs { daemon_type }).await?;
        let daemons = parse_daemons(daemon_type, &output)?;
        Ok(DaemonCount::tally(&daemons, &self.original, &self.upgraded))
    }

    pub async fn census(&self) -> Result<Vec<(DaemonType, DaemonCount)>> {
        let mut rows = Vec::with_capacity(DaemonType::TRACKED.len());
        for daemon_type in DaemonType::TRACKED {
            rows.push((daemon_type, self.count_daemons_per_version(daemon_type).await?));
        }
        Ok(rows)
    }

    /// Per-service table of original / upgraded / running daemon counts.
    pub async fn status_table(&self) -> Result<Table> {
        let mut table = Table::new();
        table.set_header(vec![
            "Service",
            "Total Original Version",
            "Total Upgraded",
            "Total Running",
        ]);
        for (daemon_type, count) in self.census().await? {
            table.add_row(vec![
                daemon_type.to_string(),
                count.original.to_string(),
                count.upgraded.to_string(),
                count.running.to_string(),
            ]);
        }
        Ok(table)
    }

    /// Returns the status message when it mentions an error on two reads
    /// `error_recheck` apart.
    pub async fn check_upgrade_errors(&self) -> Result<Option<String>> {
        match self.upgrade_status().await? {
            Some(status) if status.has_error() => {
                warn!("Upgrade status reported: {}", status.message);
            }
            _ => return Ok(None),
        }
        tokio::time::sleep(self.timings.error_recheck).await;

        Ok(self
            .upgrade_status()
            .await?
            .filter(UpgradeStatus::has_error)
            .map(|status| status.message))
    }

    /// True once [`COMPLETE_CHECKS`] consecutive polls show no upgrade in
    /// progress and no pending target image. An empty reply is not idle.
    pub async fn check_upgrade_complete(&self) -> Result<bool> {
        for attempt in 0..COMPLETE_CHECKS {
            if attempt > 0 {
                tokio::time::sleep(self.timings.complete_recheck).await;
            }
            match self.upgrade_status().await? {
                Some(status) if status.is_idle() => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    pub async fn check_all_daemons_upgraded(&self) -> Result<bool> {
        let mut success = true;
        for daemon_type in DaemonType::TRACKED {
            let count = self.count_daemons_per_version(daemon_type).await?;
            if count.original != 0 {
                error!(
                    "Error not all {} daemons have been upgraded. {} still running the old version",
                    daemon_type, count.original
                );
                success = false;
                continue;
            }
            if count.upgraded != count.running {
                tokio::time::sleep(self.timings.daemon_grace).await;
                let count = self.count_daemons_per_version(daemon_type).await?;
                if !count.is_balanced() {
                    error!(
                        "Error not all upgraded {} daemons are running. {} upgraded:{}, running:{}",
                        daemon_type, daemon_type, count.upgraded, count.running
                    );
                    success = false;
                }
            }
        }
        Ok(success)
    }

    /// Polls until the upgrade completes or fails, handing each round's status
    /// table to `report`.
    pub async fn monitor_upgrade<F>(&self, mut report: F) -> Result<MonitorOutcome>
    where
        F: FnMut(&Table),
    {
        info!(
            "Monitoring Ceph upgrade from {} to {}",
            self.original, self.upgraded
        );
        loop {
            report(&self.status_table().await?);

            if let Some(message) = self.check_upgrade_errors().await? {
                return Ok(MonitorOutcome::Failed(message));
            }
            if self.check_upgrade_complete().await? {
                if self.check_all_daemons_upgraded().await? {
                    info!("Ceph upgrade to {} completed", self.upgraded);
                    return Ok(MonitorOutcome::Completed);
                }
                return Ok(MonitorOutcome::Failed(
                    "Error: not all Ceph daemons were upgraded".to_string(),
                ));
            }
            tokio::time::sleep(self.timings.poll_interval).await;
        }
    }
}
