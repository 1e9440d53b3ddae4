use std::sync::Arc;

use bubbles_core::config::ServicesConfig;
use bubbles_core::BotError;
use tracing::info;

use crate::blossom::{BlossomClient, HttpBlossomClient, StubBlossomClient};
use crate::etsy::{EtsyClient, HttpEtsyClient, StubEtsyClient};
use crate::github::{GithubClient, HttpGithubClient, StubGithubClient};
use crate::postgres::{DatabaseClient, SqlxDatabaseClient, StubDatabaseClient};
use crate::reddit::{HttpRedditClient, RedditClient, StubRedditClient};

/// Every backing service, behind its trait. Handlers never learn whether a
/// client is real or a stub.
#[derive(Clone)]
pub struct ServiceSet {
    pub reddit: Arc<dyn RedditClient>,
    pub blossom: Arc<dyn BlossomClient>,
    pub etsy: Arc<dyn EtsyClient>,
    pub github: Arc<dyn GithubClient>,
    pub database: Arc<dyn DatabaseClient>,
}

fn log_mode(service: &'static str, real: bool) {
    info!(service, mode = if real { "real" } else { "stub" }, "service client selected");
}

/// Chooses real or stub per service, once, from toggles and credentials.
/// A configured-but-unreachable database fails the build; everything else
/// degrades to a stub.
pub async fn build_services(config: &ServicesConfig) -> Result<ServiceSet, BotError> {
    let reddit: Arc<dyn RedditClient> = match (
        config.reddit.enabled,
        &config.reddit.client_id,
        &config.reddit.client_secret,
    ) {
        (true, Some(client_id), Some(client_secret)) => {
            log_mode("reddit", true);
            Arc::new(HttpRedditClient::new(
                client_id,
                client_secret,
                &config.reddit.user_agent,
            )?)
        }
        _ => {
            log_mode("reddit", false);
            Arc::new(StubRedditClient)
        }
    };

    let blossom: Arc<dyn BlossomClient> =
        match (config.blossom.enabled, &config.blossom.base_url) {
            (true, Some(base_url)) => {
                log_mode("blossom", true);
                Arc::new(HttpBlossomClient::new(base_url, config.blossom.api_key.clone())?)
            }
            _ => {
                log_mode("blossom", false);
                Arc::new(StubBlossomClient)
            }
        };

    let etsy: Arc<dyn EtsyClient> =
        match (config.etsy.enabled, &config.etsy.api_key, &config.etsy.shop_id) {
            (true, Some(api_key), Some(shop_id)) => {
                log_mode("etsy", true);
                Arc::new(HttpEtsyClient::new(api_key, shop_id)?)
            }
            _ => {
                log_mode("etsy", false);
                Arc::new(StubEtsyClient)
            }
        };

    let github: Arc<dyn GithubClient> =
        match (config.github.enabled, &config.github.repo) {
            (true, Some(repo)) => {
                log_mode("github", true);
                Arc::new(HttpGithubClient::new(repo, config.github.token.clone())?)
            }
            _ => {
                log_mode("github", false);
                Arc::new(StubGithubClient)
            }
        };

    let database: Arc<dyn DatabaseClient> =
        match (config.postgres.enabled, &config.postgres.url) {
            (true, Some(url)) => {
                log_mode("postgres", true);
                Arc::new(SqlxDatabaseClient::connect(url).await?)
            }
            _ => {
                log_mode("postgres", false);
                Arc::new(StubDatabaseClient)
            }
        };

    Ok(ServiceSet { reddit, blossom, etsy, github, database })
}

#[cfg(test)]
mod tests {
    use bubbles_core::config::ServicesConfig;

    use super::build_services;

    #[tokio::test]
    async fn defaults_build_an_all_stub_set() {
        let services = build_services(&ServicesConfig::default()).await.expect("services");

        // Stubs answer without credentials or network.
        assert!(services.reddit.subreddit_rules("askreddit").await.expect("rules").is_empty());
        assert!(services.reddit.unread_modmail().await.expect("modmail").is_empty());
        assert!(services.blossom.health().await.expect("health").healthy);
        assert_eq!(services.etsy.active_listing_count().await.expect("count"), 0);
        assert!(services.github.latest_release().await.expect("release").is_none());
        services.database.ping().await.expect("ping");
    }

    #[tokio::test]
    async fn enabled_without_credentials_still_yields_a_stub() {
        let mut config = ServicesConfig::default();
        config.reddit.enabled = true;
        config.etsy.enabled = true;

        let services = build_services(&config).await.expect("services");
        assert!(services.reddit.subreddit_rules("askreddit").await.expect("rules").is_empty());
        assert_eq!(services.etsy.active_listing_count().await.expect("count"), 0);
    }
}
