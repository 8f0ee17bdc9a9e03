//! Ceph orchestrator upgrades.
//!
//! [`upgrade::Upgrade`] validates the target version and registry, checks the
//! image can be pulled and issues `ceph orch upgrade start`.
//! [`monitor::UpgradeMonitor`] then polls `orch upgrade status` and the
//! per-service daemon census until the upgrade has either finished on every
//! daemon or reported an error.

pub mod cluster;
pub mod command;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod upgrade;
pub mod version;

pub use cluster::{ceph_version, CephCli, CephCluster};
pub use command::{CephCommand, DaemonType};
pub use error::{CephError, Result};
pub use monitor::{DaemonCount, MonitorOutcome, MonitorTimings, UpgradeMonitor, UpgradeStatus};
pub use registry::Registry;
pub use upgrade::{Upgrade, UpgradeState};
pub use version::CephVersion;
