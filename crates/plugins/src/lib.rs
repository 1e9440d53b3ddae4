//! Command plugins, passive listeners, and the event dispatcher.
//!
//! A [`registry::PluginRegistry`] is wired explicitly at startup: each
//! plugin is registered in order, its trigger pattern is compiled once, and
//! the registry then dispatches at most one plugin per message event.

use std::sync::Arc;

use bubbles_core::BotError;
use bubbles_slack::identity::BotIdentity;

pub mod commands;
pub mod dispatch;
pub mod listeners;
pub mod matcher;
pub mod plugin;
pub mod registry;

pub use dispatch::EventRouter;
pub use plugin::{PassiveListener, Plugin};
pub use registry::{PluginRegistry, PluginRegistryBuilder, ProcessOutcome};

/// The stock plugin set: ping, echo, suggest, help (which lists the others),
/// plus the echo-shout listener.
pub fn builtin_registry(identity: BotIdentity) -> Result<PluginRegistry, BotError> {
    let plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(commands::PingPlugin),
        Arc::new(commands::EchoPlugin),
        Arc::new(commands::SuggestPlugin),
    ];
    let help_entries = plugins
        .iter()
        .filter_map(|plugin| plugin.help_text().map(str::to_owned))
        .collect::<Vec<_>>();

    let mut builder = PluginRegistryBuilder::new(identity);
    for plugin in plugins {
        builder = builder.register(plugin)?;
    }
    builder
        .register(Arc::new(commands::HelpPlugin::new(help_entries)))?
        .listen(Arc::new(listeners::EchoShoutListener::new()))
        .build()
}
