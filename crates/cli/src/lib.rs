pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "switchboard",
    about = "Switchboard operator CLI",
    long_about = "Inspect agent routing, run migrations and manage handoff history.",
    after_help = "Examples:\n  switchboard doctor --json\n  \
                  switchboard route --intent complex-analysis\n  \
                  switchboard handoffs history session-42"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, agent catalog, DB connectivity and handoff schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "List the built-in agent catalog with status and priority")]
    Agents,
    #[command(about = "Dry-run routing for an intent against the built-in catalog")]
    Route {
        #[arg(long = "intent", help = "Intent type, e.g. `pricing` or `multi-step`")]
        intent_type: String,
        #[arg(long, default_value = "general", help = "Intent action")]
        action: String,
        #[arg(long, default_value = "", help = "User message for the turn")]
        message: String,
    },
    #[command(subcommand, about = "Read or clear persisted handoff history")]
    Handoffs(HandoffsCommand),
}

#[derive(Debug, Subcommand)]
enum HandoffsCommand {
    #[command(about = "Show handoffs for a session, newest first")]
    History { session_id: String },
    #[command(about = "Delete handoffs for one session, or every session with --all")]
    Clear {
        session_id: Option<String>,
        #[arg(long, help = "Clear history for every session")]
        all: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Migrate => commands::migrate::run(),
        Command::Agents => commands::agents::run(),
        Command::Route { intent_type, action, message } => {
            commands::route::run(&intent_type, &action, &message)
        }
        Command::Handoffs(HandoffsCommand::History { session_id }) => {
            commands::handoffs::history(&session_id)
        }
        Command::Handoffs(HandoffsCommand::Clear { session_id, all }) => {
            commands::handoffs::clear(session_id.as_deref(), all)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
