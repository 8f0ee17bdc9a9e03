//! Site Layout Service: xname <-> hostname lookups for management nodes.

use crate::error::{ApiError, Result};
use crate::session::ApiSession;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SEARCH_HARDWARE_PATH: &str = "/apis/sls/v1/search/hardware";

/// Query selecting management hardware from [`SEARCH_HARDWARE_PATH`].
pub const MANAGEMENT_ROLE_QUERY: (&str, &str) = ("extra_properties.Role", "Management");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraProperties {
    #[serde(rename = "Aliases", default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlsHardware {
    #[serde(rename = "Xname")]
    pub xname: String,
    #[serde(rename = "ExtraProperties", default, skip_serializing_if = "Option::is_none")]
    pub extra_properties: Option<ExtraProperties>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl SlsHardware {
    /// `ExtraProperties.Aliases`, which every management node is expected to carry.
    pub fn aliases(&self) -> Result<&[String]> {
        self.extra_properties
            .as_ref()
            .and_then(|e| e.aliases.as_deref())
            .ok_or_else(|| ApiError::MissingField {
                service: "sls",
                field: "[ExtraProperties][Aliases]".to_string(),
            })
    }
}

/// Xname of the node whose aliases include `hostname`.
pub fn find_xname(hardware: &[SlsHardware], hostname: &str) -> Result<String> {
    for node in hardware {
        if node.aliases()?.iter().any(|a| a == hostname) {
            return Ok(node.xname.clone());
        }
    }
    Err(ApiError::NotFound(format!(
        "hostname:{} was not found in management nodes.",
        hostname
    )))
}

/// First alias of the node with the given xname.
pub fn find_hostname(hardware: &[SlsHardware], xname: &str) -> Result<String> {
    let node = hardware
        .iter()
        .find(|n| n.xname == xname)
        .ok_or_else(|| ApiError::NotFound(format!("xname:{} was not found in management nodes.", xname)))?;
    node.aliases()?
        .first()
        .cloned()
        .ok_or_else(|| ApiError::MissingField {
            service: "sls",
            field: "[ExtraProperties][Aliases][0]".to_string(),
        })
}

pub struct SlsClient<'a> {
    session: &'a ApiSession,
}

impl<'a> SlsClient<'a> {
    pub fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn get_management_components(&self) -> Result<Vec<SlsHardware>> {
        let request = self
            .session
            .get(SEARCH_HARDWARE_PATH)
            .query(&[MANAGEMENT_ROLE_QUERY]);
        self.session
            .send_json(request, "get management components from sls")
            .await
    }

    pub async fn get_xname(&self, hostname: &str) -> Result<String> {
        let hardware = self.get_management_components().await?;
        find_xname(&hardware, hostname)
    }

    pub async fn get_hostname(&self, xname: &str) -> Result<String> {
        let hardware = self.get_management_components().await?;
        find_hostname(&hardware, xname)
    }
}
