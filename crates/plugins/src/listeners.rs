use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::payload::Payload;
use bubbles_slack::utils::Utilities;

use crate::plugin::PassiveListener;

/// When someone posts in all caps, shouts the previous (non-shout) message
/// in that channel back at them, uppercased. The previous message is cached
/// per channel.
pub struct EchoShoutListener {
    last_message: Mutex<HashMap<String, String>>,
}

impl EchoShoutListener {
    pub fn new() -> Self {
        Self { last_message: Mutex::new(HashMap::new()) }
    }

    fn is_shout(text: &str) -> bool {
        let has_letters = text.chars().any(char::is_alphabetic);
        has_letters && !text.chars().any(char::is_lowercase)
    }
}

impl Default for EchoShoutListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PassiveListener for EchoShoutListener {
    fn name(&self) -> &'static str {
        "echo_shout"
    }

    async fn observe(&self, payload: &Payload, utils: &Utilities) -> Result<(), BotError> {
        let Some(text) = payload.text.as_deref().map(str::trim).filter(|text| !text.is_empty())
        else {
            return Ok(());
        };

        let reply = if Self::is_shout(text) {
            let cached = self.last_message.lock().map_or(None, |mut cache| {
                cache.remove(&payload.channel_id)
            });
            cached.map(|previous| previous.to_uppercase())
        } else {
            if let Ok(mut cache) = self.last_message.lock() {
                cache.insert(payload.channel_id.clone(), text.to_owned());
            }
            None
        };

        if let Some(reply) = reply {
            utils.say(&reply).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::EchoShoutListener;

    #[test]
    fn shout_detection_requires_letters_and_no_lowercase() {
        assert!(EchoShoutListener::is_shout("WHY IS IT DOWN"));
        assert!(EchoShoutListener::is_shout("HELP 123!"));
        assert!(!EchoShoutListener::is_shout("quiet words"));
        assert!(!EchoShoutListener::is_shout("Mixed CASE"));
        assert!(!EchoShoutListener::is_shout("12345 !!!"));
    }
}
