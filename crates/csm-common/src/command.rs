//! Running external admin binaries (`radosgw-admin`, `ceph`, `podman`) and capturing their output.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Errors raised while running or interpreting a sub-command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command exited with a non-zero return code.
    #[error("{program} exited with return code {code}: {stderr}")]
    Failed {
        /// Program name (first argument).
        program: String,
        /// Process return code.
        code: i32,
        /// Captured stderr.
        stderr: String,
    },
    /// The working directory could not be changed.
    #[error("invalid directory [{}]: {source}", path.display())]
    InvalidDirectory {
        /// Requested directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for command operations.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Captured result of a finished sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The argument vector that was run.
    pub args: Vec<String>,
    /// Decoded stdout.
    pub stdout: String,
    /// Decoded stderr, or the spawn error message.
    pub stderr: String,
    /// Process return code; the OS errno (or -1) when the program could not be spawned.
    pub return_code: i32,
    /// Wall time spent waiting on the process.
    pub duration: Duration,
}

impl CommandOutput {
    /// Builds an output by hand. Used by scripted runners.
    pub fn new(args: &[&str], stdout: impl Into<String>, stderr: impl Into<String>, return_code: i32) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            return_code,
            duration: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.return_code == 0
    }

    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    /// Turns a non-zero exit into [`CommandError::Failed`] carrying stderr.
    pub fn into_result(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandError::Failed {
                program: self.program().to_string(),
                code: self.return_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Seam between the clients that shell out and the process table.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `args[0]` with the remaining arguments and waits for it to exit.
    async fn run(&self, args: &[&str]) -> CommandOutput;
}

/// Runs commands on the local host.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    silence: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the per-invocation `info` log line.
    pub fn silenced() -> Self {
        Self { silence: true }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, args: &[&str]) -> CommandOutput {
        run_command(args, self.silence).await
    }
}

/// Runs a command without a shell and captures its output.
///
/// Spawn failures never surface as `Err`: the returned output carries the OS
/// error in `stderr` and the errno as `return_code`, so callers only have to
/// look at one place.
pub async fn run_command(args: &[&str], silence: bool) -> CommandOutput {
    if !silence {
        info!("Running sub-command: {}", args.join(" "));
    }

    let start = Instant::now();
    let Some((program, rest)) = args.split_first() else {
        error!("Could not find command for given args: {:?}", args);
        return CommandOutput::new(args, "", "no command given", -1);
    };

    let mut output = match Command::new(program).args(rest).output().await {
        Ok(out) => CommandOutput {
            args: args.iter().map(|a| a.to_string()).collect(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            return_code: out.status.code().unwrap_or(-1),
            duration: Duration::ZERO,
        },
        Err(e) => {
            error!("Could not find command for given args: {:?}", args);
            CommandOutput::new(args, "", e.to_string(), e.raw_os_error().unwrap_or(-1))
        }
    };
    output.duration = start.elapsed();

    if output.return_code != 0 {
        info!(
            "{} ran for {:.6} (sec) with return code {}",
            args.join(" "),
            output.duration.as_secs_f64(),
            output.return_code
        );
    }
    output
}

/// Changes into a directory and restores the previous working directory on drop.
#[derive(Debug)]
pub struct DirGuard {
    original: PathBuf,
}

impl DirGuard {
    pub fn enter(dir: &Path, create: bool) -> Result<Self> {
        let original = std::env::current_dir().map_err(|source| CommandError::InvalidDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        if create && !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| CommandError::InvalidDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        if let Err(source) = std::env::set_current_dir(dir) {
            warn!("Invalid directory [{}]", dir.display());
            return Err(CommandError::InvalidDirectory {
                path: dir.to_path_buf(),
                source,
            });
        }
        Ok(Self { original })
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.original) {
            warn!("Failed to return to [{}]: {}", self.original.display(), e);
        }
    }
}
