use crate::auth::Auth;
use crate::error::{ApiError, Result};
use csm_common::CsmConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// An HTTP client bound to the API gateway and a bearer token.
#[derive(Clone)]
pub struct ApiSession {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiSession {
    /// Builds the gateway client. Certificate checks are off unless `verify_tls` is set,
    /// since the gateway normally presents the cluster's self-signed certificate.
    pub fn http_client(config: &CsmConfig) -> Result<Client> {
        Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(ApiError::Client)
    }

    /// Refreshes the token and binds it to the configured gateway.
    pub async fn connect(config: &CsmConfig, auth: &mut Auth) -> Result<Self> {
        auth.refresh_token().await?;
        let token = auth.token()?.to_string();
        Ok(Self {
            client: Self::http_client(config)?,
            base_url: config.gateway_url(),
            token,
        })
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Self::http_client(&CsmConfig::default())?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.token)
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(&self.token)
    }

    /// Sends the request and insists on `200 OK`.
    pub async fn send(&self, request: RequestBuilder, op: &str) -> Result<Response> {
        let response = request.send().await.map_err(|source| ApiError::Request {
            op: op.to_string(),
            source,
        })?;
        let status = response.status();
        debug!("{} -> {}", op, status);
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                op: op.to_string(),
                status,
            });
        }
        Ok(response)
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, op: &str) -> Result<T> {
        let response = self.send(request, op).await?;
        response.json().await.map_err(|source| ApiError::Decode {
            op: op.to_string(),
            source,
        })
    }
}
