use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::blocks::MessageBuilder;
use bubbles_slack::transport::ChatTransport;
use bubbles_services::reddit::{ModmailConversation, RedditClient};
use tracing::{debug, info};

use crate::job::PeriodicJob;

const INITIAL_DELAY: Duration = Duration::from_secs(45);
const INTERVAL: Duration = Duration::from_secs(300);

/// Polls unread modmail and posts a notification per new conversation.
/// Already-announced conversation ids are remembered for the process
/// lifetime so a conversation is announced once.
pub struct ModmailJob {
    reddit: Arc<dyn RedditClient>,
    transport: Arc<dyn ChatTransport>,
    channel: String,
    announced: Mutex<HashSet<String>>,
}

impl ModmailJob {
    pub fn new(
        reddit: Arc<dyn RedditClient>,
        transport: Arc<dyn ChatTransport>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            reddit,
            transport,
            channel: channel.into(),
            announced: Mutex::new(HashSet::new()),
        }
    }

    fn fresh_only(&self, conversations: Vec<ModmailConversation>) -> Vec<ModmailConversation> {
        let Ok(announced) = self.announced.lock() else {
            return conversations;
        };
        conversations
            .into_iter()
            .filter(|conversation| !announced.contains(&conversation.id))
            .collect()
    }

    fn mark_announced(&self, id: &str) {
        if let Ok(mut announced) = self.announced.lock() {
            announced.insert(id.to_owned());
        }
    }

    async fn post_notification(
        &self,
        conversation: &ModmailConversation,
    ) -> Result<(), BotError> {
        let authors = if conversation.authors.is_empty() {
            "unknown sender".to_owned()
        } else {
            conversation.authors.join(", ")
        };
        let message = MessageBuilder::new(format!("New modmail: {}", conversation.subject))
            .header("modmail.title.v1", "New modmail")
            .section("modmail.subject.v1", |section| {
                section.mrkdwn(format!("*{}*", conversation.subject));
            })
            .divider("modmail.divider.v1")
            .context("modmail.meta.v1", |context| {
                context.mrkdwn(format!(
                    "From {authors} · updated {}",
                    conversation.last_updated.format("%Y-%m-%d %H:%M UTC")
                ));
            })
            .build();
        self.transport
            .post_message(&self.channel, &message.fallback_text, Some(&message.blocks), None)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PeriodicJob for ModmailJob {
    fn name(&self) -> &'static str {
        "modmail"
    }

    fn initial_delay(&self) -> Duration {
        INITIAL_DELAY
    }

    fn interval(&self) -> Duration {
        INTERVAL
    }

    async fn job(&self) -> Result<(), BotError> {
        let unread = self.reddit.unread_modmail().await?;
        let fresh = self.fresh_only(unread);
        if fresh.is_empty() {
            debug!("no new modmail");
            return Ok(());
        }

        info!(count = fresh.len(), "announcing new modmail conversations");
        for conversation in &fresh {
            // A conversation counts as announced only once its post lands;
            // a failed post leaves it eligible for the next poll.
            self.post_notification(conversation).await?;
            self.mark_announced(&conversation.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bubbles_core::rules::SubredditRule;
    use bubbles_services::error::ServiceError;
    use bubbles_services::reddit::{ModmailConversation, RedditClient};
    use bubbles_slack::testing::RecordingTransport;
    use chrono::Utc;

    use super::ModmailJob;
    use crate::job::PeriodicJob;

    struct FixedModmail(Vec<ModmailConversation>);

    #[async_trait]
    impl RedditClient for FixedModmail {
        async fn subreddit_rules(
            &self,
            _subreddit: &str,
        ) -> Result<Vec<SubredditRule>, ServiceError> {
            Ok(Vec::new())
        }

        async fn unread_modmail(&self) -> Result<Vec<ModmailConversation>, ServiceError> {
            Ok(self.0.clone())
        }
    }

    fn conversation(id: &str, subject: &str) -> ModmailConversation {
        ModmailConversation {
            id: id.to_owned(),
            subject: subject.to_owned(),
            authors: vec!["worried_user".to_owned()],
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn each_conversation_is_announced_exactly_once() {
        let transport = Arc::new(RecordingTransport::new());
        let reddit = Arc::new(FixedModmail(vec![
            conversation("abc", "ban appeal"),
            conversation("def", "flair request"),
        ]));
        let job = ModmailJob::new(reddit, transport.clone(), "bottest");

        job.job().await.expect("first run");
        job.job().await.expect("second run");

        let posts = transport.posts();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].text.contains("ban appeal"));
        assert!(posts[1].text.contains("flair request"));
    }

    #[tokio::test]
    async fn a_failed_post_is_retried_on_the_next_poll() {
        let transport = Arc::new(RecordingTransport::new());
        let reddit = Arc::new(FixedModmail(vec![conversation("abc", "ban appeal")]));
        let job = ModmailJob::new(reddit, transport.clone(), "bottest");

        transport.fail_posts(true);
        job.job().await.expect_err("post failure propagates");
        assert!(transport.posts().is_empty());

        transport.fail_posts(false);
        job.job().await.expect("second run");
        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].text.contains("ban appeal"));

        // Once delivered, the conversation stays announced.
        job.job().await.expect("third run");
        assert_eq!(transport.posts().len(), 1);
    }

    #[tokio::test]
    async fn empty_modmail_posts_nothing() {
        let transport = Arc::new(RecordingTransport::new());
        let job =
            ModmailJob::new(Arc::new(FixedModmail(Vec::new())), transport.clone(), "bottest");

        job.job().await.expect("job");
        assert!(transport.posts().is_empty());
    }
}
