//! Hardware State Manager: management components by role and subrole.

use crate::error::{ApiError, Result};
use crate::session::ApiSession;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const COMPONENTS_PATH: &str = "/apis/smd/hsm/v2/State/Components";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSubrole {
    ManagementMaster,
    ManagementWorker,
    ManagementStorage,
}

impl RoleSubrole {
    pub const ALL: [RoleSubrole; 3] = [
        RoleSubrole::ManagementMaster,
        RoleSubrole::ManagementWorker,
        RoleSubrole::ManagementStorage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSubrole::ManagementMaster => "Management_Master",
            RoleSubrole::ManagementWorker => "Management_Worker",
            RoleSubrole::ManagementStorage => "Management_Storage",
        }
    }

    pub fn role(&self) -> &'static str {
        "Management"
    }

    pub fn subrole(&self) -> &'static str {
        match self {
            RoleSubrole::ManagementMaster => "Master",
            RoleSubrole::ManagementWorker => "Worker",
            RoleSubrole::ManagementStorage => "Storage",
        }
    }
}

impl fmt::Display for RoleSubrole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleSubrole {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        RoleSubrole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ApiError::InvalidRoleSubrole(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ComponentsResponse {
    #[serde(rename = "Components")]
    components: Vec<Component>,
}

pub struct HsmClient<'a> {
    session: &'a ApiSession,
}

impl<'a> HsmClient<'a> {
    pub fn new(session: &'a ApiSession) -> Self {
        Self { session }
    }

    pub async fn get_components(&self, role_subrole: RoleSubrole) -> Result<Vec<Component>> {
        let op = format!("get components with subrole {}", role_subrole.subrole());
        let request = self
            .session
            .get(COMPONENTS_PATH)
            .query(&[("role", role_subrole.role()), ("subrole", role_subrole.subrole())]);
        let response: ComponentsResponse = self.session.send_json(request, &op).await?;
        Ok(response.components)
    }

    pub async fn get_xnames(&self, role_subrole: RoleSubrole) -> Result<Vec<String>> {
        let components = self.get_components(role_subrole).await?;
        if components.is_empty() {
            warn!("no components were found with hsm_role_subrole: {}", role_subrole);
        }
        Ok(components.into_iter().map(|c| c.id).collect())
    }
}
