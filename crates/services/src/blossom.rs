use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ServiceError;

const SERVICE: &str = "blossom";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostHealth {
    pub healthy: bool,
    pub detail: String,
}

#[async_trait]
pub trait BlossomClient: Send + Sync {
    async fn health(&self) -> Result<HostHealth, ServiceError>;
}

pub struct HttpBlossomClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBlossomClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(Self { client, base_url: base_url.into(), api_key })
    }
}

#[async_trait]
impl BlossomClient for HttpBlossomClient {
    async fn health(&self) -> Result<HostHealth, ServiceError> {
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response =
            request.send().await.map_err(|error| ServiceError::http(SERVICE, error))?;
        let status = response.status();
        Ok(HostHealth {
            healthy: status.is_success(),
            detail: format!("{url} responded {status}"),
        })
    }
}

/// Always-healthy stand-in for hosts without a configured endpoint.
#[derive(Default)]
pub struct StubBlossomClient;

#[async_trait]
impl BlossomClient for StubBlossomClient {
    async fn health(&self) -> Result<HostHealth, ServiceError> {
        debug!("blossom stub: reporting healthy");
        Ok(HostHealth { healthy: true, detail: "blossom checks disabled".to_owned() })
    }
}
