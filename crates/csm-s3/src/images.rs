//! Resolving the kernel / initrd / rootfs triple from an image manifest.

use crate::error::{Result, S3Error};
use crate::object::S3Object;
use crate::radosgw::Radosgw;
use csm_common::BootImages;
use serde::Deserialize;
use tracing::info;

/// Artifact types in lookup order.
pub const IMAGE_TYPES: [&str; 3] = ["initrd", "kernel", "rootfs"];

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactLink {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub link: ArtifactLink,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageManifest {
    pub artifacts: Vec<Artifact>,
}

impl ImageManifest {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(S3Error::Manifest)
    }

    /// Path of the first artifact whose type mentions `image_type`
    /// (`application/vnd.cray.image.rootfs.squashfs` matches `rootfs`).
    pub fn find(&self, image_type: &'static str) -> Result<&str> {
        self.artifacts
            .iter()
            .find(|a| a.kind.contains(image_type))
            .map(|a| a.link.path.as_str())
            .ok_or(S3Error::MissingImage(image_type))
    }

    pub fn boot_images(&self) -> Result<BootImages> {
        let [initrd, kernel, rootfs] = IMAGE_TYPES;
        Ok(BootImages {
            initrd: self.find(initrd)?.to_string(),
            kernel: self.find(kernel)?.to_string(),
            rootfs: self.find(rootfs)?.to_string(),
        })
    }
}

pub fn manifest_key(image_id: &str) -> String {
    format!("{}/manifest.json", image_id)
}

/// Reads `{image_id}/manifest.json` from `bucket` and resolves its boot images.
pub async fn get_s3_image_info(
    radosgw: Radosgw,
    bucket: &str,
    image_id: &str,
    endpoint: &str,
) -> Result<BootImages> {
    let mut object = S3Object::new(radosgw, bucket, manifest_key(image_id)).await?;
    let body = object.get_object(endpoint).await?;
    let images = ImageManifest::from_slice(&body)?.boot_images()?;
    info!("Using images: {}", images);
    Ok(images)
}
