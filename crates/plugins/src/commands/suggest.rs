use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::utils::Utilities;

use crate::plugin::Plugin;

/// Posts a suggestion as a top-level message pre-seeded with vote reactions
/// so the channel can weigh in.
#[derive(Default)]
pub struct SuggestPlugin;

#[async_trait]
impl Plugin for SuggestPlugin {
    fn name(&self) -> &'static str {
        "suggest"
    }

    fn trigger_words(&self) -> &[&'static str] {
        &["suggest", "suggestion"]
    }

    fn help_text(&self) -> Option<&str> {
        Some("`suggest <idea>` — post an idea for the channel to vote on")
    }

    async fn process(&self, text: &str, utils: &Utilities) -> Result<(), BotError> {
        let idea = text.trim();
        if idea.is_empty() {
            return Err(BotError::BadInput(
                "a suggestion needs some text, e.g. `suggest more coffee`".to_owned(),
            ));
        }

        let author = utils
            .sender_username()
            .await?
            .unwrap_or_else(|| utils.sender_id().to_owned());
        let handle = utils.say(&format!("New suggestion from {author}:\n> {idea}")).await?;
        utils.reaction_add(Some(&handle), "thumbsup").await?;
        utils.reaction_add(Some(&handle), "thumbsdown").await?;
        Ok(())
    }
}
