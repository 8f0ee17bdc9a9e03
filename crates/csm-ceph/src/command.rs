//! The handful of `ceph` admin commands the upgrade flow needs.

use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonType {
    Mon,
    Mgr,
    Osd,
    Mds,
    Rgw,
    Crash,
}

impl DaemonType {
    /// Daemon classes whose versions must converge before an upgrade counts as done.
    pub const TRACKED: [DaemonType; 5] = [
        DaemonType::Mon,
        DaemonType::Mgr,
        DaemonType::Osd,
        DaemonType::Rgw,
        DaemonType::Crash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonType::Mon => "mon",
            DaemonType::Mgr => "mgr",
            DaemonType::Osd => "osd",
            DaemonType::Mds => "mds",
            DaemonType::Rgw => "rgw",
            DaemonType::Crash => "crash",
        }
    }
}

impl fmt::Display for DaemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CephCommand {
    Version,
    OrchPs { daemon_type: DaemonType },
    UpgradeStatus,
    UpgradeStart { image: String },
}

impl CephCommand {
    pub fn prefix(&self) -> &'static str {
        match self {
            CephCommand::Version => "version",
            CephCommand::OrchPs { .. } => "orch ps",
            CephCommand::UpgradeStatus => "orch upgrade status",
            CephCommand::UpgradeStart { .. } => "orch upgrade start",
        }
    }

    /// The equivalent monitor command, as a mon_command client would send it.
    pub fn to_mon_json(&self) -> Value {
        match self {
            CephCommand::Version => json!({"prefix": self.prefix(), "format": "json"}),
            CephCommand::OrchPs { daemon_type } => json!({
                "prefix": self.prefix(),
                "daemon_type": daemon_type.as_str(),
                "format": "json",
            }),
            CephCommand::UpgradeStatus => json!({"prefix": self.prefix(), "format": "json"}),
            CephCommand::UpgradeStart { image } => json!({"prefix": self.prefix(), "image": image}),
        }
    }

    /// Arguments for the `ceph` binary, without the program name.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.prefix().split(' ').map(str::to_string).collect();
        match self {
            CephCommand::OrchPs { daemon_type } => {
                args.extend(["--daemon_type".to_string(), daemon_type.as_str().to_string()]);
            }
            CephCommand::UpgradeStart { image } => {
                args.extend(["--image".to_string(), image.clone()]);
            }
            CephCommand::Version | CephCommand::UpgradeStatus => {}
        }
        if !matches!(self, CephCommand::UpgradeStart { .. }) {
            args.extend(["--format".to_string(), "json".to_string()]);
        }
        args
    }
}

impl fmt::Display for CephCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cli_args().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orch_ps_args() {
        let cmd = CephCommand::OrchPs { daemon_type: DaemonType::Osd };
        assert_eq!(cmd.cli_args(), ["orch", "ps", "--daemon_type", "osd", "--format", "json"]);
        assert_eq!(
            cmd.to_mon_json(),
            json!({"prefix": "orch ps", "daemon_type": "osd", "format": "json"})
        );
    }

    #[test]
    fn test_upgrade_start_args() {
        let cmd = CephCommand::UpgradeStart { image: "registry.local/ceph:v17.2.6".to_string() };
        assert_eq!(
            cmd.cli_args(),
            ["orch", "upgrade", "start", "--image", "registry.local/ceph:v17.2.6"]
        );
        assert_eq!(cmd.to_mon_json()["image"], "registry.local/ceph:v17.2.6");
    }

    #[test]
    fn test_status_and_version_args() {
        assert_eq!(CephCommand::Version.cli_args(), ["version", "--format", "json"]);
        assert_eq!(CephCommand::UpgradeStatus.to_string(), "orch upgrade status --format json");
    }

    #[test]
    fn test_tracked_daemons_exclude_mds() {
        assert!(!DaemonType::TRACKED.contains(&DaemonType::Mds));
        assert_eq!(DaemonType::TRACKED.len(), 5);
    }
}
