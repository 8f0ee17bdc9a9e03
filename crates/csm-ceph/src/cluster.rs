use crate::command::CephCommand;
use crate::error::{CephError, Result};
use async_trait::async_trait;
use csm_common::CommandRunner;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Anything that can execute a [`CephCommand`] and hand back its raw output.
#[async_trait]
pub trait CephCluster: Send + Sync {
    async fn run(&self, command: &CephCommand) -> Result<String>;
}

/// Drives the cluster through the `ceph` admin binary.
#[derive(Clone)]
pub struct CephCli {
    runner: Arc<dyn CommandRunner>,
    conf: PathBuf,
}

impl CephCli {
    pub fn new(runner: Arc<dyn CommandRunner>, conf: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            conf: conf.into(),
        }
    }

    pub fn args(&self, command: &CephCommand) -> Vec<String> {
        let mut args = vec![
            "ceph".to_string(),
            "--conf".to_string(),
            self.conf.display().to_string(),
        ];
        args.extend(command.cli_args());
        args
    }
}

#[async_trait]
impl CephCluster for CephCli {
    async fn run(&self, command: &CephCommand) -> Result<String> {
        debug!("ceph mon command: {}", command.to_mon_json());
        let args = self.args(command);
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.runner.run(&argv).await.into_result()?;
        Ok(out.stdout)
    }
}

/// Parses `ceph version --format json` output down to the release number.
///
/// The version string looks like
/// `ceph version 17.2.6 (d7ff0d10654d2280e08f1ab989c7cdf3064446a5) quincy (stable)`.
pub fn parse_version_output(output: &str) -> Result<String> {
    let command = CephCommand::Version.to_string();
    let value: Value = serde_json::from_str(output).map_err(|source| CephError::Parse {
        command: command.clone(),
        source,
    })?;
    let text = value
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| CephError::Unexpected {
            command: command.clone(),
            detail: "no version key".to_string(),
        })?;
    text.split(' ')
        .nth(2)
        .map(str::to_string)
        .ok_or_else(|| CephError::Unexpected {
            command,
            detail: format!("cannot find release in {:?}", text),
        })
}

/// Version of Ceph the cluster is currently running.
pub async fn ceph_version(cluster: &dyn CephCluster) -> Result<String> {
    let output = cluster.run(&CephCommand::Version).await?;
    parse_version_output(&output)
}
