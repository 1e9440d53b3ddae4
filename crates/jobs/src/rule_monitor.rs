use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bubbles_core::rules::{diff_rules, RuleSnapshot, RuleStore};
use bubbles_core::BotError;
use bubbles_slack::blocks::MessageBuilder;
use bubbles_slack::transport::ChatTransport;
use bubbles_services::reddit::RedditClient;
use chrono::Utc;
use tracing::{debug, info};

use crate::job::PeriodicJob;

const INITIAL_DELAY: Duration = Duration::from_secs(30);
const INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Watches subreddit rule listings for changes. Each run fetches the rules
/// for every watched subreddit, diffs them against the persisted snapshot,
/// posts an alert when something changed, and saves the new snapshot.
pub struct RuleMonitorJob {
    reddit: Arc<dyn RedditClient>,
    transport: Arc<dyn ChatTransport>,
    channel: String,
    store: RuleStore,
    subreddits: Vec<String>,
}

impl RuleMonitorJob {
    pub fn new(
        reddit: Arc<dyn RedditClient>,
        transport: Arc<dyn ChatTransport>,
        channel: impl Into<String>,
        store: RuleStore,
        subreddits: Vec<String>,
    ) -> Self {
        Self { reddit, transport, channel: channel.into(), store, subreddits }
    }

    async fn post_alert(
        &self,
        subreddit: &str,
        changes: &[bubbles_core::rules::RuleChange],
    ) -> Result<(), BotError> {
        let mut builder = MessageBuilder::new(format!("Rules changed in r/{subreddit}"))
            .header("rules.title.v1", format!("Rules changed in r/{subreddit}"))
            .divider("rules.divider.v1");
        for (position, change) in changes.iter().enumerate() {
            let line = change.summary();
            builder = builder
                .section(format!("rules.change.{}.v1", position + 1), |section| {
                    section.mrkdwn(line);
                });
        }
        let message = builder.build();
        self.transport
            .post_message(&self.channel, &message.fallback_text, Some(&message.blocks), None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PeriodicJob for RuleMonitorJob {
    fn name(&self) -> &'static str {
        "rule_monitor"
    }

    fn initial_delay(&self) -> Duration {
        INITIAL_DELAY
    }

    fn interval(&self) -> Duration {
        INTERVAL
    }

    async fn job(&self) -> Result<(), BotError> {
        let mut snapshots = self.store.load()?;
        let mut dirty = false;

        for subreddit in &self.subreddits {
            let rules = self.reddit.subreddit_rules(subreddit).await?;
            let previous =
                snapshots.get(subreddit).map(|snapshot| snapshot.rules.as_slice()).unwrap_or(&[]);
            let changes = diff_rules(previous, &rules);

            if changes.is_empty() && snapshots.contains_key(subreddit) {
                debug!(subreddit, "subreddit rules unchanged");
                continue;
            }

            // First sighting of a subreddit seeds the snapshot silently.
            if snapshots.contains_key(subreddit) {
                info!(subreddit, change_count = changes.len(), "subreddit rules changed");
                self.post_alert(subreddit, &changes).await?;
            }
            snapshots
                .insert(subreddit.clone(), RuleSnapshot { last_updated: Utc::now(), rules });
            dirty = true;
        }

        if dirty {
            self.store.save(&snapshots)?;
        }
        Ok(())
    }
}
