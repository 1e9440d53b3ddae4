//! Core types shared across the Bubbles workspace: configuration loading,
//! the chat-facing error kinds, and the persisted rule-snapshot store.

pub mod config;
pub mod errors;
pub mod rules;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use errors::BotError;
pub use rules::{diff_rules, RuleChange, RuleSnapshot, RuleStore, StateError, SubredditRule};
