pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use crate::commands::run::RunOptions;

#[derive(Debug, Parser)]
#[command(
    name = "bubbles",
    version,
    disable_version_flag = true,
    about = "Chat-operations bot for the moderation workspace",
    after_help = "Examples:\n  bubbles\n  bubbles --interactive\n  bubbles --startup-check\n  bubbles selfcheck"
)]
pub struct Cli {
    #[arg(short = 'v', long = "version", action = ArgAction::Version, help = "Print version")]
    version: (),

    #[arg(long, help = "Drive the bot from a terminal console instead of the socket transport")]
    interactive: bool,

    #[arg(long, value_name = "NAME", help = "Reserved for one-shot command execution")]
    command: Option<String>,

    #[arg(long, help = "Load configuration, plugin registry, and job set, then exit")]
    startup_check: bool,

    #[arg(long, value_name = "PATH", help = "Path to the configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    subcommand: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the in-process diagnostic suite with per-check timing details")]
    Selfcheck,
    #[command(about = "Drop into the debugging console (same as --interactive)")]
    Shell,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.subcommand {
        Some(Command::Selfcheck) => commands::selfcheck::run(cli.config),
        Some(Command::Shell) => commands::run::run(RunOptions {
            config_path: cli.config,
            interactive: true,
            startup_check: false,
        }),
        None => {
            if let Some(name) = cli.command {
                commands::CommandResult::failure(
                    "run",
                    "reserved_flag",
                    format!(
                        "`--command {name}` is reserved and not wired up yet; \
                         run without it or use `--interactive`"
                    ),
                    2,
                )
            } else {
                commands::run::run(RunOptions {
                    config_path: cli.config,
                    interactive: cli.interactive,
                    startup_check: cli.startup_check,
                })
            }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
