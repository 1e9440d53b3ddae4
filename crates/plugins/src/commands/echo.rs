use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::utils::Utilities;

use crate::plugin::Plugin;

#[derive(Default)]
pub struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn trigger_words(&self) -> &[&'static str] {
        &["echo"]
    }

    fn help_text(&self) -> Option<&str> {
        Some("`echo <text>` — repeat the text back")
    }

    async fn process(&self, text: &str, utils: &Utilities) -> Result<(), BotError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BotError::BadInput("nothing to echo — give me some text".to_owned()));
        }
        utils.respond(text).await?;
        Ok(())
    }
}
