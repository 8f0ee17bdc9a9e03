use crate::error::{Result, S3Error};
use crate::radosgw::{Radosgw, S3Credentials};
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

pub const S3_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
pub const S3_READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_ENDPOINT: &str = "http://rgw-vip";

/// An object in radosgw, read with the credentials of whoever owns it.
///
/// Owner and credentials are looked up on first use and cached.
pub struct S3Object {
    radosgw: Radosgw,
    bucket: String,
    key: String,
    owner: Option<String>,
    credentials: Option<S3Credentials>,
}

impl S3Object {
    /// Fails if the bucket does not exist.
    pub async fn new(radosgw: Radosgw, bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        radosgw.verify_bucket_exists(&bucket).await?;
        Ok(Self {
            radosgw,
            bucket,
            key: key.into(),
            owner: None,
            credentials: None,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn owner(&mut self) -> Result<String> {
        if let Some(owner) = &self.owner {
            return Ok(owner.clone());
        }
        let owner = self.radosgw.object_owner(&self.bucket, &self.key).await?;
        debug!("s3://{}/{} is owned by {}", self.bucket, self.key, owner);
        self.owner = Some(owner.clone());
        Ok(owner)
    }

    pub async fn credentials(&mut self) -> Result<S3Credentials> {
        if let Some(creds) = &self.credentials {
            return Ok(creds.clone());
        }
        let owner = self.owner().await?;
        let creds = self.radosgw.user_credentials(&owner).await?;
        self.credentials = Some(creds.clone());
        Ok(creds)
    }

    fn client(endpoint: &str, creds: &S3Credentials) -> aws_sdk_s3::Client {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(S3_CONNECT_TIMEOUT)
            .read_timeout(S3_READ_TIMEOUT)
            .build();
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new(
                creds.access_key.clone(),
                creds.secret_key.clone(),
                None,
                None,
                "radosgw-admin",
            ))
            .force_path_style(true)
            .timeout_config(timeouts)
            .build();
        aws_sdk_s3::Client::from_conf(config)
    }

    /// Downloads the whole object body.
    pub async fn get_object(&mut self, endpoint: &str) -> Result<Bytes> {
        let creds = self.credentials().await?;
        let fail = |message: String| S3Error::GetObject {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            message,
        };

        let output = Self::client(endpoint, &creds)
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|e| fail(DisplayErrorContext(&e).to_string()))?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| fail(e.to_string()))?;
        Ok(body.into_bytes())
    }
}
