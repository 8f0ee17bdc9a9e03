use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported config file extension: {0}")]
    UnsupportedExtension(String),
}

/// Endpoints and knobs shared by every CSM admin tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsmConfig {
    pub api_gateway_address: String,
    pub rgw_endpoint: String,
    pub boot_images_bucket: String,
    pub auth_secret_name: String,
    pub auth_namespace: String,
    pub ceph_conf: PathBuf,
    pub verify_tls: bool,
    pub http_timeout_secs: u64,
    pub log_path: PathBuf,
}

impl Default for CsmConfig {
    fn default() -> Self {
        Self {
            api_gateway_address: String::from("api-gw-service-nmn.local"),
            rgw_endpoint: String::from("http://rgw-vip"),
            boot_images_bucket: String::from("boot-images"),
            auth_secret_name: String::from("admin-client-auth"),
            auth_namespace: String::from("default"),
            ceph_conf: PathBuf::from("/etc/ceph/ceph.conf"),
            verify_tls: false,
            http_timeout_secs: 30,
            log_path: PathBuf::from("/var/log/libcsm.log"),
        }
    }
}

impl CsmConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(&contents)?),
            "json" => Ok(serde_json::from_str(&contents)?),
            _ => Err(ConfigError::UnsupportedExtension(ext.to_string())),
        }
    }

    /// Base URL of the API gateway.
    pub fn gateway_url(&self) -> String {
        format!("https://{}", self.api_gateway_address)
    }
}
