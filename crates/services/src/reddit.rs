use std::time::Duration;

use async_trait::async_trait;
use bubbles_core::rules::SubredditRule;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;

const SERVICE: &str = "reddit";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModmailConversation {
    pub id: String,
    pub subject: String,
    pub authors: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

#[async_trait]
pub trait RedditClient: Send + Sync {
    async fn subreddit_rules(&self, subreddit: &str) -> Result<Vec<SubredditRule>, ServiceError>;

    async fn unread_modmail(&self) -> Result<Vec<ModmailConversation>, ServiceError>;
}

pub struct HttpRedditClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl HttpRedditClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: &str,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(Self { client, client_id: client_id.into(), client_secret: client_secret.into() })
    }

    async fn access_token(&self) -> Result<String, ServiceError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|error| ServiceError::http(SERVICE, error))?
            .error_for_status()
            .map_err(|error| ServiceError::http(SERVICE, error))?;

        let token: TokenResponse =
            response.json().await.map_err(|error| ServiceError::http(SERVICE, error))?;
        Ok(token.access_token)
    }
}

#[derive(Deserialize)]
struct RulesResponse {
    rules: Vec<RuleEntry>,
}

#[derive(Deserialize)]
struct RuleEntry {
    priority: u32,
    short_name: String,
    #[serde(default)]
    description: String,
    created_utc: f64,
}

#[derive(Deserialize)]
struct ModmailResponse {
    conversations: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl RedditClient for HttpRedditClient {
    async fn subreddit_rules(&self, subreddit: &str) -> Result<Vec<SubredditRule>, ServiceError> {
        let url = format!("https://www.reddit.com/r/{subreddit}/about/rules.json");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| ServiceError::http(SERVICE, error))?
            .error_for_status()
            .map_err(|error| ServiceError::http(SERVICE, error))?;

        let parsed: RulesResponse =
            response.json().await.map_err(|error| ServiceError::http(SERVICE, error))?;

        Ok(parsed
            .rules
            .into_iter()
            .map(|entry| SubredditRule {
                index: entry.priority,
                name: entry.short_name,
                description: entry.description,
                created_time: DateTime::from_timestamp(entry.created_utc as i64, 0)
                    .unwrap_or_else(Utc::now),
            })
            .collect())
    }

    async fn unread_modmail(&self) -> Result<Vec<ModmailConversation>, ServiceError> {
        let token = self.access_token().await?;
        let url = format!("{OAUTH_BASE}/api/mod/conversations?state=unread");
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| ServiceError::http(SERVICE, error))?
            .error_for_status()
            .map_err(|error| ServiceError::http(SERVICE, error))?;

        let parsed: ModmailResponse =
            response.json().await.map_err(|error| ServiceError::http(SERVICE, error))?;

        let mut conversations = Vec::with_capacity(parsed.conversations.len());
        for (id, conversation) in parsed.conversations {
            let subject = conversation
                .get("subject")
                .and_then(|value| value.as_str())
                .ok_or_else(|| ServiceError::decode(SERVICE, "conversation missing subject"))?
                .to_owned();
            let authors = conversation
                .get("authors")
                .and_then(|value| value.as_array())
                .map(|authors| {
                    authors
                        .iter()
                        .filter_map(|author| author.get("name").and_then(|name| name.as_str()))
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            let last_updated = conversation
                .get("lastUpdated")
                .and_then(|value| value.as_str())
                .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
                .unwrap_or_else(Utc::now);
            conversations.push(ModmailConversation { id, subject, authors, last_updated });
        }
        Ok(conversations)
    }
}

/// Credential-less stand-in: no rules, no modmail.
#[derive(Default)]
pub struct StubRedditClient;

#[async_trait]
impl RedditClient for StubRedditClient {
    async fn subreddit_rules(&self, subreddit: &str) -> Result<Vec<SubredditRule>, ServiceError> {
        debug!(subreddit, "reddit stub: no rules");
        Ok(Vec::new())
    }

    async fn unread_modmail(&self) -> Result<Vec<ModmailConversation>, ServiceError> {
        debug!("reddit stub: no modmail");
        Ok(Vec::new())
    }
}
