use std::process::ExitCode;

fn main() -> ExitCode {
    tagbot_cli::run()
}
