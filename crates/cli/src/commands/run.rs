use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use bubbles_core::config::{AppConfig, LoadOptions};
use bubbles_core::rules::RuleStore;
use bubbles_jobs::{EventLoop, ModmailJob, RuleMonitorJob, WelcomePingJob};
use bubbles_plugins::{builtin_registry, EventRouter};
use bubbles_services::build_services;
use bubbles_slack::identity::{BotIdentity, IdentityCache};
use bubbles_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};
use bubbles_slack::transport::{ChatTransport, NoopTransport};
use tracing::{info, warn};

use crate::commands::repl::{run_console, ConsoleTransport};
use crate::commands::CommandResult;

/// Bot user id prefilled into the identity cache when the process has no
/// real workspace connection.
pub(crate) const LOCAL_BOT_USER_ID: &str = "UB0TLOCAL";

pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub interactive: bool,
    pub startup_check: bool,
}

pub fn run(options: RunOptions) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "run",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    match runtime.block_on(run_bot(options)) {
        Ok(message) => CommandResult::success("run", message),
        Err(error) => CommandResult::failure("run", "bootstrap", format!("{error:#}"), 1),
    }
}

fn init_logging(config: &AppConfig) {
    use bubbles_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    // A second in-process invocation must not panic.
    let result = match config.logging.format {
        Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().try_init()
        }
    };
    if let Err(error) = result {
        eprintln!("logging initialization skipped: {error}");
    }
}

async fn run_bot(options: RunOptions) -> Result<&'static str> {
    let config = AppConfig::load(LoadOptions {
        config_path: options.config_path.clone(),
        require_file: options.config_path.is_some(),
        overrides: Default::default(),
    })?;
    init_logging(&config);

    let services = build_services(&config.services).await?;

    let transport: Arc<dyn ChatTransport> = if options.interactive {
        Arc::new(ConsoleTransport::new())
    } else {
        Arc::new(NoopTransport)
    };
    info!(
        event_name = "system.bot.transport_mode",
        transport_mode = if options.interactive { "console" } else { "noop" },
        "chat transport initialized"
    );

    let bot_identity = BotIdentity {
        user_id: LOCAL_BOT_USER_ID.to_owned(),
        username: config.bot.username.clone(),
    };
    let identity = Arc::new(IdentityCache::prefilled(transport.clone(), bot_identity.clone()));

    // The registry is fully populated before any event reaches the router.
    let registry = Arc::new(builtin_registry(bot_identity)?);
    let router = Arc::new(EventRouter::new(registry, transport.clone(), identity.clone()));

    let channel = resolve_channel(transport.as_ref(), &config.bot.default_channel).await;

    let mut event_loop = EventLoop::new();
    event_loop.register(Arc::new(RuleMonitorJob::new(
        services.reddit.clone(),
        transport.clone(),
        channel.clone(),
        RuleStore::open(config.state.rules_path.clone()),
        config.services.reddit.subreddits.clone(),
    )));
    event_loop.register(Arc::new(WelcomePingJob::new(transport.clone(), channel.clone())));
    event_loop.register(Arc::new(ModmailJob::new(
        services.reddit.clone(),
        transport.clone(),
        channel.clone(),
    )));

    if options.startup_check {
        info!(
            event_name = "system.bot.startup_check",
            plugin_count = router.registry().plugin_count(),
            job_count = event_loop.job_count(),
            "startup check passed"
        );
        return Ok("startup check passed");
    }

    if let Err(error) =
        transport.post_message(&channel, &startup_message(&config), None, None).await
    {
        warn!(error = %error, channel = %channel, "startup ping failed; continuing");
    }

    event_loop.start();

    if options.interactive {
        run_console(router, &config.bot.command_prefix, &channel).await?;
    } else {
        let runner = SocketModeRunner::new(
            Arc::new(NoopSocketTransport),
            router,
            ReconnectPolicy::default(),
        );
        runner.start().await?;
        info!(event_name = "system.bot.started", "bubbles started");
        wait_for_shutdown().await?;
    }

    info!(event_name = "system.bot.stopping", "bubbles stopping");
    event_loop.stop().await;
    Ok("shut down cleanly")
}

fn startup_message(config: &AppConfig) -> String {
    format!("{} is online", config.bot.username)
}

/// Maps the configured channel short-name to an id when the transport can
/// list channels; otherwise the name is used as-is.
async fn resolve_channel(transport: &dyn ChatTransport, name: &str) -> String {
    match transport.channels_list().await {
        Ok(channels) => channels
            .into_iter()
            .find(|channel| channel.name == name)
            .map(|channel| channel.id)
            .unwrap_or_else(|| name.to_owned()),
        Err(error) => {
            warn!(error = %error, "channel listing failed; using configured name");
            name.to_owned()
        }
    }
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
