//! Client for the admin REST API endpoints the authorization core needs.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::types::{LoginEnvelope, LoginRequest, PermissionsEnvelope};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// The three backend calls behind login, logout and permission loading.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginEnvelope, ApiError>;

    /// Notify the backend that `token` is being discarded. The body is ignored.
    async fn logout(&self, token: &str) -> Result<(), ApiError>;

    /// Permissions and roles of the actor owning `token`.
    async fn fetch_permissions(&self, token: &str) -> Result<PermissionsEnvelope, ApiError>;
}

/// Endpoint paths, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub logout: String,
    pub permissions: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            logout: "/auth/logout".to_string(),
            permissions: "/auth/permissions".to_string(),
        }
    }
}

/// [`AdminApi`] over HTTP with bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpAdminApi {
    client: reqwest::Client,
    api_url: String,
    endpoints: Endpoints,
}

impl HttpAdminApi {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        Self::with_endpoints(api_url, timeout, Endpoints::default())
    }

    pub fn with_endpoints(
        api_url: impl Into<String>,
        timeout: Duration,
        endpoints: Endpoints,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            endpoints,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ApiError::Api(status, resp.text().await.unwrap_or_default()));
        }

        resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl AdminApi for HttpAdminApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginEnvelope, ApiError> {
        let resp = self
            .client
            .post(self.url(&self.endpoints.login))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_json(resp).await
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url(&self.endpoints.logout))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(ApiError::Api(status, resp.text().await.unwrap_or_default()));
        }
        Ok(())
    }

    async fn fetch_permissions(&self, token: &str) -> Result<PermissionsEnvelope, ApiError> {
        let resp = self
            .client
            .get(self.url(&self.endpoints.permissions))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Self::read_json(resp).await
    }
}
