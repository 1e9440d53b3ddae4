use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use bubbles_cli::commands::run::{self, RunOptions};
use bubbles_cli::commands::selfcheck;
use serde_json::Value;

#[test]
fn selfcheck_passes_with_default_config() {
    with_env(&[], || {
        let result = selfcheck::run(None);
        assert_eq!(result.exit_code, 0, "expected successful selfcheck report");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "selfcheck");
        assert_eq!(payload["status"], "pass");
        assert_eq!(payload["checks"].as_array().map(Vec::len), Some(7));
    });
}

#[test]
fn selfcheck_fails_when_token_is_malformed() {
    with_env(&[("BUBBLES_SLACK_BOT_TOKEN", "not-a-token")], || {
        let result = selfcheck::run(None);
        assert_eq!(result.exit_code, 6, "expected selfcheck failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "selfcheck");
        assert_eq!(payload["status"], "fail");
        assert_eq!(payload["checks"][0]["name"], "config_load");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][1]["message"], "skipped due to previous failure");
    });
}

#[test]
fn selfcheck_fails_when_requested_config_file_is_missing() {
    with_env(&[], || {
        let result = selfcheck::run(Some(PathBuf::from("no-such-bubbles.toml")));
        assert_eq!(result.exit_code, 6, "expected selfcheck failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["status"], "fail");
        assert_eq!(payload["checks"][0]["name"], "config_load");
    });
}

#[test]
fn startup_check_succeeds_with_default_config() {
    with_env(&[], || {
        let result = run::run(RunOptions {
            config_path: None,
            interactive: false,
            startup_check: true,
        });
        assert_eq!(result.exit_code, 0, "expected successful startup check");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "run");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "startup check passed");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BUBBLES_SLACK_BOT_TOKEN",
        "BUBBLES_SLACK_APP_TOKEN",
        "BUBBLES_SLACK_SIGNING_SECRET",
        "BUBBLES_BOT_USERNAME",
        "BUBBLES_DEFAULT_CHANNEL",
        "DEFAULT_CHANNEL",
        "BUBBLES_COMMAND_PREFIX",
        "BUBBLES_REDDIT_ENABLED",
        "BUBBLES_REDDIT_CLIENT_ID",
        "BUBBLES_REDDIT_CLIENT_SECRET",
        "BUBBLES_BLOSSOM_ENABLED",
        "BUBBLES_ETSY_ENABLED",
        "BUBBLES_POSTGRES_ENABLED",
        "BUBBLES_POSTGRES_URL",
        "BUBBLES_GITHUB_ENABLED",
        "BUBBLES_RULES_PATH",
        "BUBBLES_LOGGING_LEVEL",
        "BUBBLES_LOGGING_FORMAT",
        "BUBBLES_LOG_LEVEL",
        "BUBBLES_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
