use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use csm_api::{ApiSession, Auth, BssClient, HsmClient, KubeSecretStore, RoleSubrole, SlsClient};
use csm_ceph::{CephCli, MonitorTimings, Upgrade};
use csm_common::{logging, CsmConfig, LogConfig, SystemRunner};
use csm_s3::{get_s3_image_info, Radosgw};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "csm-admin")]
#[command(about = "CSM node, image and Ceph administration", long_about = None)]
pub struct Cli {
    /// TOML or JSON config file.
    #[arg(short, long, env = "CSM_ADMIN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "CSM_API_GATEWAY_ADDRESS", global = true)]
    pub api_gateway_address: Option<String>,

    /// Used when RUST_LOG is unset.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the xname of a management node.
    GetXname {
        #[arg(long)]
        hostname: String,
    },
    /// Print the hostname of a management node.
    GetHostname {
        #[arg(long)]
        xname: String,
    },
    /// List the xnames HSM holds for a role/subrole.
    GetXnames {
        #[arg(long)]
        role_subrole: String,
    },
    /// Resolve the kernel, initrd and rootfs of an IMS image.
    ImageInfo {
        #[arg(long)]
        image_id: String,
        #[arg(long)]
        endpoint_url: Option<String>,
    },
    /// Point the BSS boot parameters of nodes at an image.
    SetImage {
        #[arg(long)]
        image_id: String,
        #[arg(long)]
        role_subrole: Option<String>,
        #[arg(long, value_delimiter = ',')]
        xnames: Vec<String>,
        #[arg(long)]
        endpoint_url: Option<String>,
    },
    /// Upgrade Ceph and follow the upgrade until it finishes.
    CephUpgrade {
        #[arg(long)]
        version: String,
        #[arg(long, default_value = "registry.local")]
        registry: String,
    },
}

/// Appends `explicit` to `discovered`, skipping names already present.
pub fn merge_xnames(discovered: Vec<String>, explicit: &[String]) -> Vec<String> {
    let mut merged = Vec::with_capacity(discovered.len() + explicit.len());
    for xname in discovered.into_iter().chain(explicit.iter().cloned()) {
        if !merged.contains(&xname) {
            merged.push(xname);
        }
    }
    merged
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> Result<CsmConfig> {
        let mut config = match &self.config {
            Some(path) => CsmConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => CsmConfig::default(),
        };
        if let Some(addr) = &self.api_gateway_address {
            config.api_gateway_address = addr.clone();
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;
        let log_file = logging::init(&LogConfig {
            path: config.log_path.clone(),
            default_level: self.log_level.clone(),
        });
        if log_file.is_none() {
            warn!("No log file available, logging to stderr only");
        }

        match self.command {
            Command::GetXname { ref hostname } => {
                let session = connect(&config).await?;
                println!("{}", SlsClient::new(&session).get_xname(hostname).await?);
            }
            Command::GetHostname { ref xname } => {
                let session = connect(&config).await?;
                println!("{}", SlsClient::new(&session).get_hostname(xname).await?);
            }
            Command::GetXnames { ref role_subrole } => {
                let role_subrole: RoleSubrole = role_subrole.parse()?;
                let session = connect(&config).await?;
                for xname in HsmClient::new(&session).get_xnames(role_subrole).await? {
                    println!("{}", xname);
                }
            }
            Command::ImageInfo {
                ref image_id,
                ref endpoint_url,
            } => {
                let endpoint = endpoint_url.as_deref().unwrap_or(&config.rgw_endpoint);
                let images = get_s3_image_info(
                    radosgw(),
                    &config.boot_images_bucket,
                    image_id,
                    endpoint,
                )
                .await?;
                println!("{}", images);
            }
            Command::SetImage {
                ref image_id,
                ref role_subrole,
                ref xnames,
                ref endpoint_url,
            } => {
                set_image(
                    &config,
                    image_id,
                    role_subrole.as_deref(),
                    xnames,
                    endpoint_url.as_deref(),
                )
                .await?;
            }
            Command::CephUpgrade {
                ref version,
                ref registry,
            } => ceph_upgrade(&config, version, registry).await?,
        }
        Ok(())
    }
}

fn radosgw() -> Radosgw {
    Radosgw::new(Arc::new(SystemRunner::new()))
}

async fn connect(config: &CsmConfig) -> Result<ApiSession> {
    let store = KubeSecretStore::try_default().await?;
    let mut auth = Auth::new(Box::new(store), config)?;
    Ok(ApiSession::connect(config, &mut auth).await?)
}

async fn set_image(
    config: &CsmConfig,
    image_id: &str,
    role_subrole: Option<&str>,
    xnames: &[String],
    endpoint_url: Option<&str>,
) -> Result<()> {
    if role_subrole.is_none() && xnames.is_empty() {
        bail!("Input Error: either --role-subrole or --xnames must be specified");
    }
    let role_subrole = role_subrole.map(str::parse::<RoleSubrole>).transpose()?;

    let endpoint = endpoint_url.unwrap_or(&config.rgw_endpoint);
    let images = get_s3_image_info(radosgw(), &config.boot_images_bucket, image_id, endpoint).await?;

    let session = connect(config).await?;
    let discovered = match role_subrole {
        Some(rs) => HsmClient::new(&session).get_xnames(rs).await?,
        None => Vec::new(),
    };
    let targets = merge_xnames(discovered, xnames);
    info!("Setting image {} on {} node(s)", image_id, targets.len());

    for update in BssClient::new(&session).set_image(&targets, &images).await? {
        println!(
            "{}: rootfs={} initrd={} kernel={}",
            update.xname, update.rootfs, update.initrd, update.kernel
        );
    }
    Ok(())
}

async fn ceph_upgrade(config: &CsmConfig, version: &str, registry: &str) -> Result<()> {
    let runner = Arc::new(SystemRunner::new());
    let cluster = Arc::new(CephCli::new(runner.clone(), &config.ceph_conf));
    let mut upgrade = Upgrade::new(cluster, runner, version, registry).await?;
    upgrade.initiate_upgrade().await?;

    let outcome = upgrade
        .run_to_completion(MonitorTimings::default(), |table| println!("{}", table))
        .await?;
    let (success, message) = outcome.into_report();
    if !success {
        bail!(message);
    }
    println!("Ceph upgrade to {} completed", upgrade.upgrade_version());
    Ok(())
}
