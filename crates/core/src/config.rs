use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub bot: BotConfig,
    pub services: ServicesConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub app_token: SecretString,
    pub signing_secret: SecretString,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Display name the bot answers to (`@<username> ping`).
    pub username: String,
    /// Channel short-name for the startup ping and job output.
    pub default_channel: String,
    /// Prefix the interactive console treats as a chat message.
    pub command_prefix: String,
}

#[derive(Clone, Debug, Default)]
pub struct ServicesConfig {
    pub reddit: RedditConfig,
    pub blossom: BlossomConfig,
    pub etsy: EtsyConfig,
    pub postgres: PostgresConfig,
    pub github: GithubConfig,
}

#[derive(Clone, Debug)]
pub struct RedditConfig {
    pub enabled: bool,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub user_agent: String,
    /// Subreddits watched by the rule-monitoring job.
    pub subreddits: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct BlossomConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct EtsyConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub shop_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PostgresConfig {
    pub enabled: bool,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GithubConfig {
    pub enabled: bool,
    pub token: Option<String>,
    pub repo: Option<String>,
}

#[derive(Clone, Debug)]
pub struct StateConfig {
    /// JSON file holding the per-subreddit rule snapshots.
    pub rules_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: None,
            client_secret: None,
            user_agent: "bubbles-bot".to_string(),
            subreddits: Vec::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: String::new().into(),
                app_token: String::new().into(),
                signing_secret: String::new().into(),
            },
            bot: BotConfig {
                username: "bubbles".to_string(),
                default_channel: "bottest".to_string(),
                command_prefix: "!".to_string(),
            },
            services: ServicesConfig::default(),
            state: StateConfig { rules_path: PathBuf::from("state/subreddit_rules.json") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

/// Programmatic overrides, applied last. Used by tests and CLI flags.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_username: Option<String>,
    pub default_channel: Option<String>,
    pub command_prefix: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_app_token: Option<String>,
    pub rules_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    bot: Option<BotPatch>,
    services: Option<ServicesPatch>,
    state: Option<StatePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    app_token: Option<String>,
    signing_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    username: Option<String>,
    default_channel: Option<String>,
    command_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicesPatch {
    reddit: Option<RedditPatch>,
    blossom: Option<BlossomPatch>,
    etsy: Option<EtsyPatch>,
    postgres: Option<PostgresPatch>,
    github: Option<GithubPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RedditPatch {
    enabled: Option<bool>,
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
    subreddits: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct BlossomPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EtsyPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    shop_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PostgresPatch {
    enabled: Option<bool>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GithubPatch {
    enabled: Option<bool>,
    token: Option<String>,
    repo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatePatch {
    rules_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bubbles.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(bot_token_value) = slack.bot_token {
                self.slack.bot_token = bot_token_value.into();
            }
            if let Some(app_token_value) = slack.app_token {
                self.slack.app_token = app_token_value.into();
            }
            if let Some(signing_secret_value) = slack.signing_secret {
                self.slack.signing_secret = signing_secret_value.into();
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(username) = bot.username {
                self.bot.username = username;
            }
            if let Some(default_channel) = bot.default_channel {
                self.bot.default_channel = default_channel;
            }
            if let Some(command_prefix) = bot.command_prefix {
                self.bot.command_prefix = command_prefix;
            }
        }

        if let Some(services) = patch.services {
            if let Some(reddit) = services.reddit {
                if let Some(enabled) = reddit.enabled {
                    self.services.reddit.enabled = enabled;
                }
                if let Some(client_id) = reddit.client_id {
                    self.services.reddit.client_id = Some(client_id);
                }
                if let Some(client_secret) = reddit.client_secret {
                    self.services.reddit.client_secret = Some(client_secret);
                }
                if let Some(user_agent) = reddit.user_agent {
                    self.services.reddit.user_agent = user_agent;
                }
                if let Some(subreddits) = reddit.subreddits {
                    self.services.reddit.subreddits = subreddits;
                }
            }
            if let Some(blossom) = services.blossom {
                if let Some(enabled) = blossom.enabled {
                    self.services.blossom.enabled = enabled;
                }
                if let Some(base_url) = blossom.base_url {
                    self.services.blossom.base_url = Some(base_url);
                }
                if let Some(api_key) = blossom.api_key {
                    self.services.blossom.api_key = Some(api_key);
                }
            }
            if let Some(etsy) = services.etsy {
                if let Some(enabled) = etsy.enabled {
                    self.services.etsy.enabled = enabled;
                }
                if let Some(api_key) = etsy.api_key {
                    self.services.etsy.api_key = Some(api_key);
                }
                if let Some(shop_id) = etsy.shop_id {
                    self.services.etsy.shop_id = Some(shop_id);
                }
            }
            if let Some(postgres) = services.postgres {
                if let Some(enabled) = postgres.enabled {
                    self.services.postgres.enabled = enabled;
                }
                if let Some(url) = postgres.url {
                    self.services.postgres.url = Some(url);
                }
            }
            if let Some(github) = services.github {
                if let Some(enabled) = github.enabled {
                    self.services.github.enabled = enabled;
                }
                if let Some(token) = github.token {
                    self.services.github.token = Some(token);
                }
                if let Some(repo) = github.repo {
                    self.services.github.repo = Some(repo);
                }
            }
        }

        if let Some(state) = patch.state {
            if let Some(rules_path) = state.rules_path {
                self.state.rules_path = rules_path;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BUBBLES_SLACK_BOT_TOKEN") {
            self.slack.bot_token = value.into();
        }
        if let Some(value) = read_env("BUBBLES_SLACK_APP_TOKEN") {
            self.slack.app_token = value.into();
        }
        if let Some(value) = read_env("BUBBLES_SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = value.into();
        }

        if let Some(value) = read_env("BUBBLES_BOT_USERNAME") {
            self.bot.username = value;
        }
        let default_channel =
            read_env("BUBBLES_DEFAULT_CHANNEL").or_else(|| read_env("DEFAULT_CHANNEL"));
        if let Some(value) = default_channel {
            self.bot.default_channel = value;
        }
        if let Some(value) = read_env("BUBBLES_COMMAND_PREFIX") {
            self.bot.command_prefix = value;
        }

        if let Some(value) = read_env("BUBBLES_REDDIT_ENABLED") {
            self.services.reddit.enabled = parse_bool("BUBBLES_REDDIT_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BUBBLES_REDDIT_CLIENT_ID") {
            self.services.reddit.client_id = Some(value);
        }
        if let Some(value) = read_env("BUBBLES_REDDIT_CLIENT_SECRET") {
            self.services.reddit.client_secret = Some(value);
        }
        if let Some(value) = read_env("BUBBLES_REDDIT_USER_AGENT") {
            self.services.reddit.user_agent = value;
        }
        if let Some(value) = read_env("BUBBLES_REDDIT_SUBREDDITS") {
            self.services.reddit.subreddits =
                value.split(',').map(|name| name.trim().to_string()).collect();
        }

        if let Some(value) = read_env("BUBBLES_BLOSSOM_ENABLED") {
            self.services.blossom.enabled = parse_bool("BUBBLES_BLOSSOM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BUBBLES_BLOSSOM_BASE_URL") {
            self.services.blossom.base_url = Some(value);
        }
        if let Some(value) = read_env("BUBBLES_BLOSSOM_API_KEY") {
            self.services.blossom.api_key = Some(value);
        }

        if let Some(value) = read_env("BUBBLES_ETSY_ENABLED") {
            self.services.etsy.enabled = parse_bool("BUBBLES_ETSY_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BUBBLES_ETSY_API_KEY") {
            self.services.etsy.api_key = Some(value);
        }
        if let Some(value) = read_env("BUBBLES_ETSY_SHOP_ID") {
            self.services.etsy.shop_id = Some(value);
        }

        if let Some(value) = read_env("BUBBLES_POSTGRES_ENABLED") {
            self.services.postgres.enabled = parse_bool("BUBBLES_POSTGRES_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BUBBLES_POSTGRES_URL") {
            self.services.postgres.url = Some(value);
        }

        if let Some(value) = read_env("BUBBLES_GITHUB_ENABLED") {
            self.services.github.enabled = parse_bool("BUBBLES_GITHUB_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BUBBLES_GITHUB_TOKEN") {
            self.services.github.token = Some(value);
        }
        if let Some(value) = read_env("BUBBLES_GITHUB_REPO") {
            self.services.github.repo = Some(value);
        }

        if let Some(value) = read_env("BUBBLES_RULES_PATH") {
            self.state.rules_path = PathBuf::from(value);
        }

        let log_level = read_env("BUBBLES_LOGGING_LEVEL").or_else(|| read_env("BUBBLES_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BUBBLES_LOGGING_FORMAT").or_else(|| read_env("BUBBLES_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_username) = overrides.bot_username {
            self.bot.username = bot_username;
        }
        if let Some(default_channel) = overrides.default_channel {
            self.bot.default_channel = default_channel;
        }
        if let Some(command_prefix) = overrides.command_prefix {
            self.bot.command_prefix = command_prefix;
        }
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = slack_bot_token.into();
        }
        if let Some(slack_app_token) = overrides.slack_app_token {
            self.slack.app_token = slack_app_token.into();
        }
        if let Some(rules_path) = overrides.rules_path {
            self.state.rules_path = rules_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        let bot_token = self.slack.bot_token.expose_secret();
        if !bot_token.is_empty() && !bot_token.starts_with("xoxb-") {
            return Err(ConfigError::Validation(
                "slack.bot_token must start with `xoxb-` when set".to_string(),
            ));
        }
        let app_token = self.slack.app_token.expose_secret();
        if !app_token.is_empty() && !app_token.starts_with("xapp-") {
            return Err(ConfigError::Validation(
                "slack.app_token must start with `xapp-` when set".to_string(),
            ));
        }

        if self.bot.username.trim().is_empty() {
            return Err(ConfigError::Validation("bot.username must not be empty".to_string()));
        }
        if self.bot.default_channel.trim().is_empty() {
            return Err(ConfigError::Validation(
                "bot.default_channel must not be empty".to_string(),
            ));
        }
        if self.bot.command_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "bot.command_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn resolve_config_path(requested: Option<&Path>) -> Option<PathBuf> {
    match requested {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) => None,
        None => {
            let default = PathBuf::from("bubbles.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_are_valid_without_any_file() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");
        assert_eq!(config.bot.username, "bubbles");
        assert_eq!(config.bot.command_prefix, "!");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(!config.services.reddit.enabled);
    }

    #[test]
    fn toml_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
[bot]
username = "squeaky"
default_channel = "mod-ops"

[services.reddit]
enabled = true
subreddits = ["TranscribersOfReddit"]

[logging]
level = "debug"
format = "json"
"#
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("config loads");

        assert_eq!(config.bot.username, "squeaky");
        assert_eq!(config.bot.default_channel, "mod-ops");
        assert!(config.services.reddit.enabled);
        assert_eq!(config.services.reddit.subreddits, vec!["TranscribersOfReddit"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn invalid_bot_token_prefix_fails_validation() {
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                slack_bot_token: Some("not-a-bot-token".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = match result {
            Err(ConfigError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(message.contains("slack.bot_token"));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                bot_username: Some("testbot".to_string()),
                default_channel: Some("qa".to_string()),
                slack_bot_token: Some("xoxb-123".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config loads");

        assert_eq!(config.bot.username, "testbot");
        assert_eq!(config.bot.default_channel, "qa");
        assert_eq!(config.slack.bot_token.expose_secret(), "xoxb-123");
    }
}
