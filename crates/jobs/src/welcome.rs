use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::blocks::MessageBuilder;
use bubbles_slack::transport::{ChatTransport, HistoryQuery};
use tracing::{debug, info};

use crate::job::PeriodicJob;

const INITIAL_DELAY: Duration = Duration::from_secs(120);
const INTERVAL: Duration = Duration::from_secs(3600);
const WELCOME_MARKER: &str = ":wave:";
const HISTORY_LIMIT: u16 = 50;

/// Reminds the channel about welcome messages nobody has replied to yet.
/// A welcome message is any recent message carrying the wave marker; an
/// unanswered one has no thread replies.
pub struct WelcomePingJob {
    transport: Arc<dyn ChatTransport>,
    channel: String,
}

impl WelcomePingJob {
    pub fn new(transport: Arc<dyn ChatTransport>, channel: impl Into<String>) -> Self {
        Self { transport, channel: channel.into() }
    }
}

#[async_trait]
impl PeriodicJob for WelcomePingJob {
    fn name(&self) -> &'static str {
        "welcome_ping"
    }

    fn initial_delay(&self) -> Duration {
        INITIAL_DELAY
    }

    fn interval(&self) -> Duration {
        INTERVAL
    }

    async fn job(&self) -> Result<(), BotError> {
        let history = self
            .transport
            .conversations_history(&HistoryQuery {
                channel: self.channel.clone(),
                oldest: None,
                latest: None,
                limit: Some(HISTORY_LIMIT),
            })
            .await?;

        let unanswered: Vec<_> = history
            .iter()
            .filter(|message| message.text.contains(WELCOME_MARKER) && message.reply_count == 0)
            .collect();

        if unanswered.is_empty() {
            debug!(channel = %self.channel, "no unanswered welcome messages");
            return Ok(());
        }
        info!(
            channel = %self.channel,
            unanswered = unanswered.len(),
            "posting welcome reminder"
        );

        let count = unanswered.len();
        let headline = if count == 1 {
            "A new member is still waiting for a hello".to_owned()
        } else {
            format!("{count} new members are still waiting for a hello")
        };
        let mut builder = MessageBuilder::new(headline.clone())
            .header("welcome.title.v1", "Welcome check")
            .section("welcome.summary.v1", |section| {
                section.mrkdwn(&headline);
            })
            .divider("welcome.divider.v1");
        for (position, message) in unanswered.iter().enumerate() {
            let line = match &message.user {
                Some(user) => format!("<@{user}> said: {}", message.text),
                None => message.text.clone(),
            };
            builder = builder
                .section(format!("welcome.entry.{}.v1", position + 1), |section| {
                    section.mrkdwn(line);
                });
        }
        builder = builder.context("welcome.footer.v1", |context| {
            context.mrkdwn("Drop into the thread and say hi.");
        });

        let message = builder.build();
        self.transport
            .post_message(&self.channel, &message.fallback_text, Some(&message.blocks), None)
            .await?;
        Ok(())
    }
}
