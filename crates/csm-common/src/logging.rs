//! Tracing bootstrap: stderr output plus an append-only log file.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_PATH: &str = "/var/log/libcsm.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub path: PathBuf,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_PATH),
            default_level: String::from("info"),
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Opens the log file, falling back to its basename in the working directory.
pub fn open_log_file(path: &Path) -> Option<(File, PathBuf)> {
    open_with_fallback(path, Path::new(""))
}

fn open_with_fallback(path: &Path, fallback_dir: &Path) -> Option<(File, PathBuf)> {
    match open_append(path) {
        Ok(file) => Some((file, path.to_path_buf())),
        Err(e) => {
            let fallback =
                fallback_dir.join(path.file_name().unwrap_or_else(|| OsStr::new("libcsm.log")));
            eprintln!(
                "Failed to open {}\n{}\nwriting logs to present working directory.",
                path.display(),
                e
            );
            open_append(&fallback).ok().map(|file| (file, fallback))
        }
    }
}

/// Installs the global subscriber. Returns the log file actually in use, if any.
///
/// Calling this twice is harmless; the second registration is ignored.
pub fn init(config: &LogConfig) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let opened = open_log_file(&config.path);
    let used = opened.as_ref().map(|(_, p)| p.clone());
    let file_layer = opened.map(|(file, _)| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Arc::new(file))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    used
}
