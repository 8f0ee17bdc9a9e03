//! Boot Script Service: per-node kernel, initrd and rootfs boot parameters.

use crate::error::{ApiError, Result};
use crate::session::ApiSession;
use csm_common::BootImages;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

pub const BOOTPARAMS_PATH: &str = "/apis/bss/boot/v1/bootparameters";

/// Kernel argument that carries the rootfs location.
pub const ROOTFS_ARG: &str = "metal.server=";

/// One BSS boot parameter record. Keys we do not touch survive a GET/PATCH cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootParams {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub initrd: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BootParams {
    pub fn rootfs(&self) -> Result<&str> {
        current_rootfs(&self.params)
    }
}

/// The images a node ended up with after a patch, read back from BSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpdate {
    pub xname: String,
    pub rootfs: String,
    pub initrd: String,
    pub kernel: String,
}

/// Value of the `metal.server=` kernel argument.
pub fn current_rootfs(params: &str) -> Result<&str> {
    let missing = || ApiError::MissingField {
        service: "bss",
        field: format!("params[{}]", ROOTFS_ARG),
    };
    let (_, rest) = params.split_once(ROOTFS_ARG).ok_or_else(missing)?;
    let value = rest.split(' ').next().unwrap_or_default();
    if value.is_empty() {
        return Err(missing());
    }
    Ok(value)
}

/// Points a boot record at new images. Every occurrence of the current rootfs
/// path in the kernel arguments is replaced, not just the `metal.server=` one.
pub fn apply_images(boot: &mut BootParams, images: &BootImages) -> Result<()> {
    let current = current_rootfs(&boot.params)?.to_string();
    boot.kernel = images.kernel.clone();
    boot.initrd = images.initrd.clone();
    boot.params = boot.params.replace(&current, &images.rootfs);
    Ok(())
}

pub struct BssClient<'a> {
    session: &'a ApiSession,
}

impl<'a> BssClient<'a> {
    pub fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn get_bootparams(&self, xname: &str) -> Result<BootParams> {
        let op = format!("get BSS bootparameters for {}", xname);
        let request = self
            .session
            .get(BOOTPARAMS_PATH)
            .json(&json!({ "hosts": [xname] }));
        let mut entries: Vec<BootParams> = self.session.send_json(request, &op).await?;
        if entries.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no BSS bootparameters found for {}",
                xname
            )));
        }
        Ok(entries.swap_remove(0))
    }

    pub async fn patch_bootparams(&self, boot: &BootParams) -> Result<()> {
        let op = format!("patch BSS bootparameters for {}", boot.hosts.join(","));
        let request = self.session.patch(BOOTPARAMS_PATH).json(boot);
        self.session.send(request, &op).await?;
        info!("BSS entry patched");
        Ok(())
    }

    /// Patches each node onto `images` and reads the result back.
    ///
    /// Stops at the first node that fails; nodes before it stay patched.
    pub async fn set_image(&self, xnames: &[String], images: &BootImages) -> Result<Vec<ImageUpdate>> {
        info!("Editing BSS data for components: {:?}", xnames);
        let mut updates = Vec::with_capacity(xnames.len());
        for xname in xnames {
            let mut boot = self.get_bootparams(xname).await?;
            apply_images(&mut boot, images)?;
            self.patch_bootparams(&boot).await?;
            info!("BSS entry for {} patched.", xname);

            let current = self.get_bootparams(xname).await?;
            updates.push(ImageUpdate {
                xname: xname.clone(),
                rootfs: current.rootfs()?.to_string(),
                initrd: current.initrd,
                kernel: current.kernel,
            });
        }
        Ok(updates)
    }
}
