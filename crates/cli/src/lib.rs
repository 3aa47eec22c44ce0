pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::component::ComponentArgs;
use commands::register::RegisterArgs;

#[derive(Debug, Parser)]
#[command(
    name = "tagbot",
    about = "Tag bot operator CLI",
    long_about = "Manage the tag database, resolve free-text queries, and inspect configuration.",
    after_help = "Examples:\n  tagbot migrate\n  tagbot resolve the load balancer is down\n  tagbot register --tag deploy --channel C0DEPLOY"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo components and tags")]
    Seed,
    #[command(about = "Resolve free-text words to tag entries the way the bot would")]
    Resolve {
        #[arg(required = true, help = "Query words, e.g. `the load balancer is down`")]
        words: Vec<String>,
        #[arg(long, help = "Override matching.similarity_threshold for this query")]
        threshold: Option<f64>,
    },
    #[command(about = "Register a tag against a component channel")]
    Register(RegisterArgs),
    #[command(about = "Create or update a component tags can be registered against")]
    Component(ComponentArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Resolve { words, threshold } => commands::resolve::run(&words, threshold),
        Command::Register(args) => commands::register::run(args),
        Command::Component(args) => commands::component::run(args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
