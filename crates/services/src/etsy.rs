use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;

const SERVICE: &str = "etsy";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_BASE: &str = "https://openapi.etsy.com/v3/application";

#[async_trait]
pub trait EtsyClient: Send + Sync {
    /// Number of currently active listings in the configured shop.
    async fn active_listing_count(&self) -> Result<u64, ServiceError>;
}

pub struct HttpEtsyClient {
    client: reqwest::Client,
    api_key: String,
    shop_id: String,
}

impl HttpEtsyClient {
    pub fn new(api_key: impl Into<String>, shop_id: impl Into<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(Self { client, api_key: api_key.into(), shop_id: shop_id.into() })
    }
}

#[async_trait]
impl EtsyClient for HttpEtsyClient {
    async fn active_listing_count(&self) -> Result<u64, ServiceError> {
        #[derive(Deserialize)]
        struct ListingsResponse {
            count: u64,
        }

        let url = format!("{API_BASE}/shops/{}/listings/active?limit=1", self.shop_id);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|error| ServiceError::http(SERVICE, error))?
            .error_for_status()
            .map_err(|error| ServiceError::http(SERVICE, error))?;

        let listings: ListingsResponse =
            response.json().await.map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(listings.count)
    }
}

#[derive(Default)]
pub struct StubEtsyClient;

#[async_trait]
impl EtsyClient for StubEtsyClient {
    async fn active_listing_count(&self) -> Result<u64, ServiceError> {
        debug!("etsy stub: zero listings");
        Ok(0)
    }
}
