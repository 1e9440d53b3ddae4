use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bubbles_core::config::{AppConfig, LoadOptions, ServicesConfig};
use bubbles_core::rules::{RuleSnapshot, RuleSnapshots, RuleStore, SubredditRule};
use bubbles_core::BotError;
use bubbles_jobs::{EventLoop, PeriodicJob};
use bubbles_plugins::builtin_registry;
use bubbles_plugins::matcher::TriggerPattern;
use bubbles_services::build_services;
use bubbles_slack::identity::BotIdentity;
use bubbles_slack::progress::LongRunningMessage;
use bubbles_slack::testing::RecordingTransport;
use chrono::Utc;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    status: CheckStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    command: &'static str,
    status: CheckStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<Check>,
}

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let load_options = LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        overrides: Default::default(),
    };
    let config = match timed_check(|| AppConfig::load(load_options)) {
        Ok((elapsed_ms, config)) => {
            checks.push(Check {
                name: "config_load",
                status: CheckStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(Check {
                name: "config_load",
                status: CheckStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("plugin_registry"));
            checks.push(skipped("trigger_match"));
            checks.push(skipped("progress_render"));
            checks.push(skipped("job_schedule"));
            checks.push(skipped("service_factory"));
            checks.push(skipped("state_store"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let identity = BotIdentity {
        user_id: "U0SELFCHECK".to_owned(),
        username: config.bot.username.clone(),
    };

    match timed_check(|| builtin_registry(identity.clone())) {
        Ok((elapsed_ms, registry)) => checks.push(Check {
            name: "plugin_registry",
            status: CheckStatus::Pass,
            elapsed_ms,
            message: format!("{} plugins registered", registry.plugin_count()),
        }),
        Err((elapsed_ms, error)) => checks.push(Check {
            name: "plugin_registry",
            status: CheckStatus::Fail,
            elapsed_ms,
            message: error.to_string(),
        }),
    }

    let trigger_started = Instant::now();
    let trigger_message = TriggerPattern::compile(&identity, &["ping"]).map(|pattern| {
        let addressed = format!("@{} ping", identity.username);
        (pattern.is_match(&addressed), pattern.strip_prefix(&addressed).to_owned())
    });
    match trigger_message {
        Ok((true, rest)) if rest.is_empty() => checks.push(Check {
            name: "trigger_match",
            status: CheckStatus::Pass,
            elapsed_ms: trigger_started.elapsed().as_millis() as u64,
            message: "trigger pattern compiles and strips addressing".to_string(),
        }),
        Ok((matched, rest)) => checks.push(Check {
            name: "trigger_match",
            status: CheckStatus::Fail,
            elapsed_ms: trigger_started.elapsed().as_millis() as u64,
            message: format!("unexpected match result (matched={matched}, rest=`{rest}`)"),
        }),
        Err(error) => checks.push(Check {
            name: "trigger_match",
            status: CheckStatus::Fail,
            elapsed_ms: trigger_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        }),
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(Check {
                name: "progress_render",
                status: CheckStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("job_schedule"));
            checks.push(skipped("service_factory"));
            checks.push(skipped("state_store"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let progress_started = Instant::now();
    let progress_result = runtime.block_on(check_progress_render());
    checks.push(match progress_result {
        Ok(message) => Check {
            name: "progress_render",
            status: CheckStatus::Pass,
            elapsed_ms: progress_started.elapsed().as_millis() as u64,
            message,
        },
        Err(error) => Check {
            name: "progress_render",
            status: CheckStatus::Fail,
            elapsed_ms: progress_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        },
    });

    let schedule_started = Instant::now();
    let schedule_result = runtime.block_on(check_job_schedule());
    checks.push(match schedule_result {
        Ok(message) => Check {
            name: "job_schedule",
            status: CheckStatus::Pass,
            elapsed_ms: schedule_started.elapsed().as_millis() as u64,
            message,
        },
        Err(error) => Check {
            name: "job_schedule",
            status: CheckStatus::Fail,
            elapsed_ms: schedule_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        },
    });

    let factory_started = Instant::now();
    let factory_result = runtime.block_on(check_service_factory());
    checks.push(match factory_result {
        Ok(message) => Check {
            name: "service_factory",
            status: CheckStatus::Pass,
            elapsed_ms: factory_started.elapsed().as_millis() as u64,
            message,
        },
        Err(error) => Check {
            name: "service_factory",
            status: CheckStatus::Fail,
            elapsed_ms: factory_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        },
    });

    let store_started = Instant::now();
    checks.push(match check_state_store() {
        Ok(message) => Check {
            name: "state_store",
            status: CheckStatus::Pass,
            elapsed_ms: store_started.elapsed().as_millis() as u64,
            message,
        },
        Err(error) => Check {
            name: "state_store",
            status: CheckStatus::Fail,
            elapsed_ms: store_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        },
    });

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Runs the full status-message lifecycle against a recording transport and
/// verifies one post plus one update per mutation reached it.
async fn check_progress_render() -> Result<String, BotError> {
    let transport = Arc::new(RecordingTransport::new());
    let mut progress = LongRunningMessage::new(
        transport.clone(),
        "C0SELFCHECK",
        "Selfcheck",
        "Running checks.",
        "A check failed.",
    );
    progress.start().await?;
    progress.add_step("probe").await?;
    progress.step_succeeded(Some("done")).await?;

    let posts = transport.posts().len();
    let updates = transport.updates().len();
    if posts == 1 && updates == 2 {
        Ok("status message lifecycle rendered".to_string())
    } else {
        Err(BotError::Internal(format!(
            "expected 1 post and 2 updates, saw {posts} posts and {updates} updates"
        )))
    }
}

struct TickJob {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl PeriodicJob for TickJob {
    fn name(&self) -> &'static str {
        "selfcheck_tick"
    }

    fn initial_delay(&self) -> Duration {
        Duration::from_millis(5)
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(5)
    }

    async fn job(&self) -> Result<(), BotError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn check_job_schedule() -> Result<String, BotError> {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut event_loop = EventLoop::new();
    event_loop.register(Arc::new(TickJob { runs: runs.clone() }));
    event_loop.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    event_loop.stop().await;

    let observed = runs.load(Ordering::SeqCst);
    if observed >= 1 {
        Ok(format!("scheduler ran the probe job {observed} times"))
    } else {
        Err(BotError::Internal("scheduler never ran the probe job".to_string()))
    }
}

/// Builds the default (all-stub) service set and round-trips every client
/// trait once.
async fn check_service_factory() -> Result<String, BotError> {
    let services = build_services(&ServicesConfig::default()).await?;

    services.database.ping().await?;
    let health = services.blossom.health().await?;
    if !health.healthy {
        return Err(BotError::Internal("stub blossom client reported unhealthy".to_string()));
    }
    let listings = services.etsy.active_listing_count().await?;
    if listings != 0 {
        return Err(BotError::Internal("stub etsy client reported listings".to_string()));
    }
    if services.github.latest_release().await?.is_some() {
        return Err(BotError::Internal("stub github client returned a release".to_string()));
    }
    let rules = services.reddit.subreddit_rules("selfcheck").await?;
    if !rules.is_empty() {
        return Err(BotError::Internal("stub reddit client returned rules".to_string()));
    }

    Ok("stub service clients respond".to_string())
}

fn check_state_store() -> Result<String, BotError> {
    let path = std::env::temp_dir()
        .join(format!("bubbles-selfcheck-{}.json", std::process::id()));
    let store = RuleStore::open(path.clone());

    let mut snapshots = RuleSnapshots::new();
    snapshots.insert(
        "selfcheck".to_owned(),
        RuleSnapshot {
            last_updated: Utc::now(),
            rules: vec![SubredditRule {
                index: 1,
                name: "Be kind".to_owned(),
                description: "No harassment.".to_owned(),
                created_time: Utc::now(),
            }],
        },
    );

    let outcome = store
        .save(&snapshots)
        .and_then(|()| store.load())
        .map_err(|error| BotError::Internal(error.to_string()));
    let _ = std::fs::remove_file(&path);

    let loaded = outcome?;
    if loaded == snapshots {
        Ok("rule snapshots round-trip through disk".to_string())
    } else {
        Err(BotError::Internal("loaded snapshots differ from saved snapshots".to_string()))
    }
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> Check {
    Check {
        name,
        status: CheckStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<Check>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == CheckStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);

    let report = CheckReport {
        command: "selfcheck",
        status: if failed { CheckStatus::Fail } else { CheckStatus::Pass },
        summary: format!("selfcheck: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"selfcheck\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
