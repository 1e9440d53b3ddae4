use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::utils::Utilities;

use crate::plugin::Plugin;

/// Liveness check: replies `PONG!` to any addressed `ping`.
#[derive(Default)]
pub struct PingPlugin;

#[async_trait]
impl Plugin for PingPlugin {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn trigger_words(&self) -> &[&'static str] {
        &["ping"]
    }

    fn help_text(&self) -> Option<&str> {
        Some("`ping` — check that the bot is alive")
    }

    async fn process(&self, _text: &str, utils: &Utilities) -> Result<(), BotError> {
        utils.respond("PONG!").await?;
        Ok(())
    }
}
