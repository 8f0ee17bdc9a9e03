use crate::registry::VALID_REGISTRIES;
use csm_common::CommandError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CephError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("could not parse output of `ceph {command}`: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected output of `ceph {command}`: {detail}")]
    Unexpected { command: String, detail: String },
    #[error("Error upgrade version: {0} is not a valid format. Valid formats are 'vX.Y.Z' and 'X.Y.Z' where X, Y and Z are integers.")]
    InvalidVersion(String),
    #[error("Error upgrade version: {0} has a component larger than {max}.", max = u64::MAX)]
    VersionOutOfRange(String),
    #[error("{0} is not a valid registry. Valid registries are {valid:?}.", valid = VALID_REGISTRIES)]
    InvalidRegistry(String),
    #[error("Cannot upgrade Ceph. The upgrade version:{upgrade} is not greater than the current Ceph version running:{current}.")]
    VersionNotGreater { upgrade: String, current: String },
    #[error("Error: failed to pull image from podman. {0}")]
    ImagePull(String),
    #[error("upgrade cannot be started from state {0}")]
    WrongState(String),
}

pub type Result<T> = std::result::Result<T, CephError>;
