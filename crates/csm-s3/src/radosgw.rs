//! `radosgw-admin` lookups: bucket existence, object ownership and user keys.

use crate::error::{Result, S3Error};
use csm_common::CommandRunner;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const RADOSGW_ADMIN: &str = "radosgw-admin";

/// S3 key pair of a radosgw user.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Owner uid from `radosgw-admin object stat` output.
pub fn parse_object_owner(stdout: &str) -> Result<String> {
    let info: Value = serde_json::from_str(stdout)?;
    info.pointer("/policy/owner/id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(S3Error::MissingField("policy.owner.id"))
}

/// First key pair from `radosgw-admin user info` output.
pub fn parse_user_credentials(stdout: &str) -> Result<S3Credentials> {
    let info: Value = serde_json::from_str(stdout)?;
    let key = info
        .pointer("/keys/0")
        .ok_or(S3Error::MissingField("keys[0]"))?;
    let field = |name: &'static str, label: &'static str| {
        key.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(S3Error::MissingField(label))
    };
    Ok(S3Credentials {
        access_key: field("access_key", "keys[0].access_key")?,
        secret_key: field("secret_key", "keys[0].secret_key")?,
    })
}

#[derive(Clone)]
pub struct Radosgw {
    runner: Arc<dyn CommandRunner>,
}

impl Radosgw {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn verify_bucket_exists(&self, bucket: &str) -> Result<()> {
        self.runner
            .run(&[RADOSGW_ADMIN, "bucket", "list", "--bucket", bucket])
            .await
            .into_result()?;
        Ok(())
    }

    pub async fn object_owner(&self, bucket: &str, object: &str) -> Result<String> {
        let out = self
            .runner
            .run(&[RADOSGW_ADMIN, "object", "stat", "--object", object, "--bucket", bucket])
            .await
            .into_result()?;
        parse_object_owner(&out.stdout)
    }

    pub async fn user_credentials(&self, uid: &str) -> Result<S3Credentials> {
        let out = self
            .runner
            .run(&[RADOSGW_ADMIN, "user", "info", "--uid", uid])
            .await
            .into_result()?;
        parse_user_credentials(&out.stdout)
    }
}
