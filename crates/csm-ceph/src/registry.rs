use crate::error::{CephError, Result};
use std::fmt;
use std::str::FromStr;

pub const VALID_REGISTRIES: [&str; 4] = [
    "registry.local",
    "localhost",
    "localhost:5000",
    "artifactory.algol60.net",
];

/// Path of the Ceph image inside every registry we pull from.
pub const CEPH_IMAGE_PATH: &str = "artifactory.algol60.net/csm-docker/stable/quay.io/ceph/ceph";

/// Registry the upgrade image is pulled from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Registry {
    #[default]
    RegistryLocal,
    Localhost,
    Localhost5000,
    Artifactory,
}

impl Registry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Registry::RegistryLocal => "registry.local",
            Registry::Localhost => "localhost",
            Registry::Localhost5000 => "localhost:5000",
            Registry::Artifactory => "artifactory.algol60.net",
        }
    }

    /// Prefix placed before [`CEPH_IMAGE_PATH`]. Plain `localhost` means the local
    /// registry on port 5000; artifactory already appears in the image path.
    pub fn prefix(&self) -> &'static str {
        match self {
            Registry::RegistryLocal => "registry.local/",
            Registry::Localhost | Registry::Localhost5000 => "localhost:5000/",
            Registry::Artifactory => "",
        }
    }

    pub fn ceph_image(&self, version: &str) -> String {
        format!("{}{}:v{}", self.prefix(), CEPH_IMAGE_PATH, version)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Registry {
    type Err = CephError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "registry.local" => Ok(Registry::RegistryLocal),
            "localhost" => Ok(Registry::Localhost),
            "localhost:5000" => Ok(Registry::Localhost5000),
            "artifactory.algol60.net" => Ok(Registry::Artifactory),
            other => Err(CephError::InvalidRegistry(other.to_string())),
        }
    }
}
