//! Admin credentials from Kubernetes and the OAuth client-credentials exchange.

use async_trait::async_trait;
use csm_common::CsmConfig;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Name of the Kubernetes secret holding the admin client credentials.
pub const SECRET: &str = "admin-client-auth";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Could not resolve an API Token!")]
    NoCredentials,
    #[error("secret [{secret}] has no usable key [{key}]")]
    MissingKey { secret: String, key: &'static str },
    #[error("no authentication token has been acquired")]
    NoToken,
    #[error("token request to {endpoint} failed: {source}")]
    TokenRequest {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to contact Kubernetes: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Decoded contents of the admin client secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ClientCredentials {
    pub fn from_secret_data(
        secret: &str,
        data: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Self, AuthError> {
        let field = |key: &'static str| -> Result<String, AuthError> {
            data.get(key)
                .and_then(|v| String::from_utf8(v.clone()).ok())
                .map(|v| v.trim().to_string())
                .ok_or_else(|| AuthError::MissingKey {
                    secret: secret.to_string(),
                    key,
                })
        };
        Ok(Self {
            client_id: field("client-id")?,
            client_secret: field("client-secret")?,
            endpoint: field("endpoint")?,
        })
    }
}

/// Source of secret data, already base64-decoded.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn read_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, AuthError>;
}

/// Reads secrets through the Kubernetes API using the ambient kubeconfig.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Uses `KUBECONFIG`, `~/.kube/config` or the in-cluster service account.
    pub async fn try_default() -> Result<Self, AuthError> {
        Ok(Self::new(Client::try_default().await?))
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn read_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, AuthError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secrets.get(name).await?;
        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Holds the gateway bearer token and knows how to refresh it.
pub struct Auth {
    store: Box<dyn SecretStore>,
    http: reqwest::Client,
    secret_name: String,
    namespace: String,
    token: Option<String>,
}

impl Auth {
    pub fn new(store: Box<dyn SecretStore>, config: &CsmConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(AuthError::Client)?;
        Ok(Self {
            store,
            http,
            secret_name: config.auth_secret_name.clone(),
            namespace: config.auth_namespace.clone(),
            token: None,
        })
    }

    async fn credentials(&self) -> Result<ClientCredentials, AuthError> {
        let data = match self.store.read_secret(&self.secret_name, &self.namespace).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to resolve Kubernetes secret [{}]: {}", self.secret_name, e);
                BTreeMap::new()
            }
        };
        if data.is_empty() {
            return Err(AuthError::NoCredentials);
        }
        ClientCredentials::from_secret_data(&self.secret_name, &data)
    }

    /// Drops the current token and requests a new one.
    ///
    /// A token endpoint that answers without `access_token` leaves the token
    /// unset; [`Auth::token`] then reports [`AuthError::NoToken`].
    pub async fn refresh_token(&mut self) -> Result<(), AuthError> {
        self.clear_token();
        let creds = self.credentials().await?;

        let form = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let token_err = |source| AuthError::TokenRequest {
            endpoint: creds.endpoint.clone(),
            source,
        };
        let response = self
            .http
            .post(&creds.endpoint)
            .form(&form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(token_err)?;
        let body: TokenResponse = response.json().await.map_err(token_err)?;

        match body.access_token {
            Some(token) => {
                debug!("Acquired API token from {}", creds.endpoint);
                self.token = Some(token);
            }
            None => warn!("Token response from {} had no access_token", creds.endpoint),
        }
        Ok(())
    }

    pub fn token(&self) -> Result<&str, AuthError> {
        self.token.as_deref().ok_or(AuthError::NoToken)
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }
}
