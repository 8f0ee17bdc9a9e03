use csm_common::CommandError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum S3Error {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("could not parse radosgw-admin output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid image manifest: {0}")]
    Manifest(#[source] serde_json::Error),
    #[error("radosgw-admin output is missing {0}")]
    MissingField(&'static str),
    #[error("ERROR could not find image for {0}")]
    MissingImage(&'static str),
    #[error("failed to get s3://{bucket}/{key}: {message}")]
    GetObject {
        bucket: String,
        key: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, S3Error>;
