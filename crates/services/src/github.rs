use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;

const SERVICE: &str = "github";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_BASE: &str = "https://api.github.com";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    pub html_url: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait GithubClient: Send + Sync {
    /// Latest published release of the configured repository, if any.
    async fn latest_release(&self) -> Result<Option<Release>, ServiceError>;
}

pub struct HttpGithubClient {
    client: reqwest::Client,
    repo: String,
    token: Option<String>,
}

impl HttpGithubClient {
    pub fn new(repo: impl Into<String>, token: Option<String>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("bubbles-bot")
            .build()
            .map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(Self { client, repo: repo.into(), token })
    }
}

#[async_trait]
impl GithubClient for HttpGithubClient {
    async fn latest_release(&self) -> Result<Option<Release>, ServiceError> {
        let url = format!("{API_BASE}/repos/{}/releases/latest", self.repo);
        let mut request = self.client.get(&url).header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response =
            request.send().await.map_err(|error| ServiceError::http(SERVICE, error))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response =
            response.error_for_status().map_err(|error| ServiceError::http(SERVICE, error))?;
        let release: Release =
            response.json().await.map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(Some(release))
    }
}

#[derive(Default)]
pub struct StubGithubClient;

#[async_trait]
impl GithubClient for StubGithubClient {
    async fn latest_release(&self) -> Result<Option<Release>, ServiceError> {
        debug!("github stub: no releases");
        Ok(None)
    }
}
