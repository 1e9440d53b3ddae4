use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::utils::Utilities;

use crate::plugin::Plugin;

/// Lists the help text of every registered command. The entries are
/// collected at wiring time, after the rest of the plugin set is known.
pub struct HelpPlugin {
    rendered: String,
}

impl HelpPlugin {
    pub fn new(mut entries: Vec<String>) -> Self {
        entries.push(Self::own_help().to_owned());
        Self { rendered: format!("Available commands:\n{}", entries.join("\n")) }
    }

    fn own_help() -> &'static str {
        "`help` — show this list"
    }
}

#[async_trait]
impl Plugin for HelpPlugin {
    fn name(&self) -> &'static str {
        "help"
    }

    fn trigger_words(&self) -> &[&'static str] {
        &["help"]
    }

    fn help_text(&self) -> Option<&str> {
        Some(Self::own_help())
    }

    async fn process(&self, _text: &str, utils: &Utilities) -> Result<(), BotError> {
        utils.respond(&self.rendered).await?;
        Ok(())
    }
}
