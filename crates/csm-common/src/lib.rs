//! Shared plumbing for the CSM admin tools: subprocess execution, logging and configuration.

pub mod boot;
pub mod command;
pub mod config;
pub mod logging;

pub use boot::BootImages;
pub use command::{run_command, CommandError, CommandOutput, CommandRunner, DirGuard, SystemRunner};
pub use config::{ConfigError, CsmConfig};
pub use logging::LogConfig;
