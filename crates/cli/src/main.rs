use std::process::ExitCode;

fn main() -> ExitCode {
    bubbles_cli::run()
}
