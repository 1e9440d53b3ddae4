use async_trait::async_trait;
use bubbles_core::BotError;
use bubbles_slack::payload::Payload;
use bubbles_slack::utils::Utilities;
use tracing::{debug, error, trace};

use crate::matcher::TriggerPattern;

/// A command handler. Implementations declare trigger words and a `process`
/// body; everything else has a usable default. Plugins are instantiated once
/// at registry build time and hold no per-event state.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Non-empty, ordered. The first word is the canonical command name.
    fn trigger_words(&self) -> &[&'static str];

    fn help_text(&self) -> Option<&str> {
        None
    }

    /// When true the matched address-and-trigger prefix is stripped before
    /// `process` sees the text.
    fn sanitize_prefix(&self) -> bool {
        true
    }

    /// Emoji-name pattern for reaction events this plugin consumes.
    fn reaction_pattern(&self) -> Option<&str> {
        None
    }

    /// Default relevance: the payload carries text matching the compiled
    /// trigger pattern. Passive behavior belongs in [`PassiveListener`], not
    /// in an override here.
    async fn is_relevant(
        &self,
        payload: &Payload,
        _utils: &Utilities,
        pattern: &TriggerPattern,
    ) -> bool {
        payload.has_text() && payload.text.as_deref().is_some_and(|text| pattern.is_match(text))
    }

    fn sanitize_message(&self, text: &str, pattern: &TriggerPattern) -> String {
        if self.sanitize_prefix() {
            pattern.strip_prefix(text).to_owned()
        } else {
            text.to_owned()
        }
    }

    async fn process(&self, text: &str, utils: &Utilities) -> Result<(), BotError>;

    /// Called when a reaction event matches `reaction_pattern`.
    async fn on_reaction(&self, _utils: &Utilities) -> Result<(), BotError> {
        Ok(())
    }
}

/// Observes every message event after the single-fire dispatch, whether or
/// not a command matched. Listener failures are logged and swallowed.
#[async_trait]
pub trait PassiveListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn observe(&self, payload: &Payload, utils: &Utilities) -> Result<(), BotError>;
}

/// Runs one plugin against one event: sanitize, process, and on failure post
/// a single apology reply (with the plugin's help text when it has one).
/// Never propagates; a failure to deliver the apology itself is logged and
/// dropped.
pub(crate) async fn run_plugin(
    plugin: &dyn Plugin,
    pattern: &TriggerPattern,
    payload: &Payload,
    utils: &Utilities,
) {
    let text = payload.text.as_deref().unwrap_or_default();
    let sanitized = plugin.sanitize_message(text, pattern);
    trace!(plugin = plugin.name(), sanitized = %sanitized, "running plugin");

    let Err(process_error) = plugin.process(&sanitized, utils).await else {
        return;
    };

    if process_error.is_operator_fault() {
        error!(plugin = plugin.name(), error = %process_error, "plugin process failed");
    } else {
        debug!(plugin = plugin.name(), error = %process_error, "plugin rejected input");
    }

    let mut reply = process_error.user_reply();
    if let Some(help) = plugin.help_text() {
        reply.push('\n');
        reply.push_str(help);
    }
    if let Err(send_error) = utils.respond(&reply).await {
        debug!(
            plugin = plugin.name(),
            error = %send_error,
            "failed to deliver error reply; dropping"
        );
    }
}
