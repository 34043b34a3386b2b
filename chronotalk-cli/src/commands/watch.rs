//! Watch command - follow writes from other contexts

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use chronotalk_core::services::SyncOutcome;
use chronotalk_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(limit: Option<usize>, json: bool) -> Result<()> {
    let mut ctx = get_context()?;
    let context_id = ctx.context_id.to_string();
    let listener = ctx.sync_listener()?;
    // Writes between loading and subscribing would otherwise be missed
    listener.catch_up(&mut ctx.feed, ctx.storage.as_ref())?;

    if !json {
        output::info(&format!(
            "Watching the feed ({} posts). Press Ctrl+C to stop.",
            ctx.feed.posts().len()
        ));
    }

    let mut seen = 0;
    while limit.map_or(true, |max| seen < max) {
        let Some(outcome) = listener.wait(&mut ctx.feed, Duration::from_secs(1)) else {
            continue;
        };
        seen += 1;

        // The event log is opened per record so a long watch does not hold it
        if let SyncOutcome::Rejected { reason } = &outcome {
            log_event(
                &get_logger(&context_id),
                LogEvent::new("sync_rejected")
                    .with_command("watch")
                    .with_error(reason.clone()),
            );
        }

        if json {
            println!("{}", outcome_json(&outcome));
        } else {
            print_outcome(&outcome, ctx.feed.posts().first().map(|p| p.title.as_str()));
        }
    }

    Ok(())
}

fn outcome_json(outcome: &SyncOutcome) -> serde_json::Value {
    match outcome {
        SyncOutcome::Applied { posts } => serde_json::json!({ "outcome": "applied", "posts": posts }),
        SyncOutcome::Cleared => serde_json::json!({ "outcome": "cleared" }),
        SyncOutcome::Rejected { reason } => {
            serde_json::json!({ "outcome": "rejected", "reason": reason })
        }
        SyncOutcome::Ignored { key } => serde_json::json!({ "outcome": "ignored", "key": key }),
    }
}

fn print_outcome(outcome: &SyncOutcome, newest: Option<&str>) {
    let time = chrono::Local::now().format("%H:%M:%S").to_string();
    match outcome {
        SyncOutcome::Applied { posts } => {
            let latest = newest
                .map(|t| format!(", newest: {}", t))
                .unwrap_or_default();
            println!("{} {} {} posts{}", time.dimmed(), "synced".green(), posts, latest);
        }
        SyncOutcome::Cleared => println!("{} {}", time.dimmed(), "feed cleared".yellow()),
        SyncOutcome::Rejected { reason } => {
            println!("{} {} {}", time.dimmed(), "rejected".red(), reason)
        }
        SyncOutcome::Ignored { key } => {
            println!("{} {}", time.dimmed(), format!("ignored {}", key).dimmed())
        }
    }
}
