use std::sync::Arc;

use bubbles_core::BotError;
use bubbles_slack::identity::BotIdentity;
use bubbles_slack::payload::Payload;
use bubbles_slack::utils::Utilities;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::matcher::{AddressPattern, TriggerPattern};
use crate::plugin::{run_plugin, PassiveListener, Plugin};

struct RegisteredPlugin {
    plugin: Arc<dyn Plugin>,
    pattern: TriggerPattern,
    reaction: Option<Regex>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A plugin matched and its run wrapper completed.
    Handled { plugin: &'static str },
    /// Addressed to the bot, but no plugin matched.
    UnknownCommand,
    /// Ordinary channel traffic not directed at the bot.
    NotAddressed,
    /// No usable text, or the bot's own message.
    Ignored,
}

pub struct PluginRegistryBuilder {
    identity: BotIdentity,
    plugins: Vec<RegisteredPlugin>,
    listeners: Vec<Arc<dyn PassiveListener>>,
}

impl PluginRegistryBuilder {
    pub fn new(identity: BotIdentity) -> Self {
        Self { identity, plugins: Vec::new(), listeners: Vec::new() }
    }

    /// Registration order is dispatch order: the first relevant plugin wins.
    pub fn register(mut self, plugin: Arc<dyn Plugin>) -> Result<Self, BotError> {
        let pattern = TriggerPattern::compile(&self.identity, plugin.trigger_words())?;
        let reaction = match plugin.reaction_pattern() {
            Some(source) => Some(Regex::new(source).map_err(|error| {
                BotError::Internal(format!(
                    "plugin `{}` has an invalid reaction pattern: {error}",
                    plugin.name()
                ))
            })?),
            None => None,
        };
        self.plugins.push(RegisteredPlugin { plugin, pattern, reaction });
        Ok(self)
    }

    pub fn listen(mut self, listener: Arc<dyn PassiveListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Result<PluginRegistry, BotError> {
        let address = AddressPattern::compile(&self.identity)?;
        info!(
            plugin_count = self.plugins.len(),
            listener_count = self.listeners.len(),
            bot_user_id = %self.identity.user_id,
            "plugin registry loaded"
        );
        Ok(PluginRegistry {
            identity: self.identity,
            address,
            plugins: self.plugins,
            listeners: self.listeners,
        })
    }
}

/// Insertion-ordered plugin collection plus the passive-listener chain.
/// Built once at startup and read-only afterwards.
pub struct PluginRegistry {
    identity: BotIdentity,
    address: AddressPattern,
    plugins: Vec<RegisteredPlugin>,
    listeners: Vec<Arc<dyn PassiveListener>>,
}

impl PluginRegistry {
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Help lines for every plugin that declares help text, in registration
    /// order.
    pub fn help_entries(&self) -> Vec<String> {
        self.plugins
            .iter()
            .filter_map(|registered| registered.plugin.help_text().map(str::to_owned))
            .collect()
    }

    /// Dispatches a message event: at most one command plugin fires, then
    /// every passive listener observes the payload.
    pub async fn process(&self, payload: &Payload, utils: &Utilities) -> ProcessOutcome {
        if payload.sender_id == self.identity.user_id {
            return ProcessOutcome::Ignored;
        }
        if !payload.has_text() {
            return ProcessOutcome::Ignored;
        }
        let text = payload.text.as_deref().unwrap_or_default();

        let mut outcome = ProcessOutcome::NotAddressed;
        for registered in &self.plugins {
            if registered.plugin.is_relevant(payload, utils, &registered.pattern).await {
                run_plugin(registered.plugin.as_ref(), &registered.pattern, payload, utils).await;
                outcome = ProcessOutcome::Handled { plugin: registered.plugin.name() };
                break;
            }
        }

        if outcome == ProcessOutcome::NotAddressed && self.address.is_addressed(text) {
            let reply = format!("Unknown command: `{}`", text.trim());
            if let Err(error) = utils.respond(&reply).await {
                debug!(error = %error, "failed to deliver unknown-command reply; dropping");
            }
            outcome = ProcessOutcome::UnknownCommand;
        }

        self.walk_listeners(payload, utils).await;
        outcome
    }

    /// Routes a reaction event to the first plugin whose reaction pattern
    /// matches the emoji name.
    pub async fn handle_reaction(&self, payload: &Payload, utils: &Utilities) -> ProcessOutcome {
        if payload.sender_id == self.identity.user_id {
            return ProcessOutcome::Ignored;
        }
        let Some(reaction) = payload.reaction.as_deref() else {
            return ProcessOutcome::Ignored;
        };

        for registered in &self.plugins {
            let matched =
                registered.reaction.as_ref().is_some_and(|pattern| pattern.is_match(reaction));
            if matched {
                if let Err(error) = registered.plugin.on_reaction(utils).await {
                    warn!(
                        plugin = registered.plugin.name(),
                        reaction,
                        error = %error,
                        "reaction handler failed"
                    );
                }
                return ProcessOutcome::Handled { plugin: registered.plugin.name() };
            }
        }

        debug!(reaction, "reaction event had no consumer");
        ProcessOutcome::NotAddressed
    }

    async fn walk_listeners(&self, payload: &Payload, utils: &Utilities) {
        for listener in &self.listeners {
            if let Err(error) = listener.observe(payload, utils).await {
                warn!(listener = listener.name(), error = %error, "passive listener failed");
            }
        }
    }
}
