//! ChronoTalk CLI - a time-management social feed in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{comment, config, draft, feed, like, logs, post, profile, show, status, watch};

/// ChronoTalk - talk about time, share what works
#[derive(Parser)]
#[command(name = "ct", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List posts, newest first
    Feed {
        /// Only this category (label or slug)
        #[arg(long, short)]
        category: Option<String>,
        /// Only posts whose title or content contains this text
        #[arg(long, short)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a post and its comments
    Show {
        /// Post ID
        post_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish a post
    Post {
        /// Post title
        title: String,
        /// Post body (read from stdin when omitted)
        content: Option<String>,
        /// Category (label or slug)
        #[arg(long, short, default_value = "other")]
        category: String,
        /// Let the assistant write the body from the title
        #[arg(long, conflicts_with = "content")]
        ai: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Comment on a post
    Comment {
        /// Post ID
        post_id: String,
        /// Comment text (read from stdin when omitted)
        content: Option<String>,
        /// Have ChronoBot reply instead, in this mood (supportive, critical, funny)
        #[arg(long, value_name = "MOOD", conflicts_with = "content")]
        ai: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Like a post
    Like {
        /// Post ID
        post_id: String,
        /// Number of likes to add
        #[arg(long, short, default_value = "1")]
        times: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the local identity
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },

    /// Ask the assistant for a draft without publishing
    Draft {
        #[command(subcommand)]
        command: draft::DraftCommands,
    },

    /// Follow changes made by other ct processes
    Watch {
        /// Stop after this many notifications
        #[arg(long)]
        limit: Option<usize>,
        /// Output one JSON object per notification
        #[arg(long)]
        json: bool,
    },

    /// Show feed totals and identity
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

/// Diagnostics go to stderr, filtered by CHRONOTALK_LOG (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CHRONOTALK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let matches = Cli::command().get_matches();
    let json = wants_json(&matches);
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if json => {
            output::print_json_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Whether `--json` was passed to the innermost subcommand
fn wants_json(matches: &ArgMatches) -> bool {
    let here = matches
        .try_get_one::<bool>("json")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false);
    here || matches
        .subcommand()
        .map_or(false, |(_, sub)| wants_json(sub))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Feed {
            category,
            search,
            json,
        } => feed::run(category, search, json),
        Commands::Show { post_id, json } => show::run(&post_id, json),
        Commands::Post {
            title,
            content,
            category,
            ai,
            json,
        } => post::run(&title, content, &category, ai, json),
        Commands::Comment {
            post_id,
            content,
            ai,
            json,
        } => comment::run(&post_id, content, ai, json),
        Commands::Like {
            post_id,
            times,
            json,
        } => like::run(&post_id, times, json),
        Commands::Profile { command } => profile::run(command),
        Commands::Draft { command } => draft::run(command),
        Commands::Watch { limit, json } => watch::run(limit, json),
        Commands::Status { json } => status::run(json),
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
