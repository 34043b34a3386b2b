//! Draft command - ask the assistant for text without publishing it

use anyhow::Result;
use clap::Subcommand;

use chronotalk_core::services::{CancelToken, Mood};
use chronotalk_core::LogEvent;

use super::{get_context, get_logger, log_event, parse_category, run_assistant};
use crate::output;

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Draft a post body about a topic
    Post {
        /// Title or topic
        topic: String,
        /// Category (label or slug)
        #[arg(long, short, default_value = "other")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Draft a reply to an existing post
    Comment {
        /// Post ID
        post_id: String,
        /// supportive, critical or funny
        #[arg(long, short, default_value = "supportive")]
        mood: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: DraftCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger(&ctx.context_id.to_string());
    let cancel = CancelToken::new();

    let (text, json) = match command {
        DraftCommands::Post {
            topic,
            category,
            json,
        } => {
            let category = parse_category(&category)?;
            let text = run_assistant(
                "Drafting with the assistant...",
                &cancel,
                ctx.assistant.draft_post(&topic, category, &cancel),
            );
            (text, json)
        }
        DraftCommands::Comment {
            post_id,
            mood,
            json,
        } => {
            let mood: Mood = mood.parse()?;
            let Some(post) = ctx.feed.get_post(&post_id) else {
                anyhow::bail!("Post '{}' not found", post_id);
            };
            let text = run_assistant(
                &format!("Asking ChronoBot for a {} reply...", mood),
                &cancel,
                ctx.assistant.draft_comment(&post.content, mood, &cancel),
            );
            (text, json)
        }
    };

    let text = match text {
        Ok(text) => text,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("assistant_failed")
                    .with_command("draft")
                    .with_error(e.to_string()),
            );
            return Err(e);
        }
    };
    log_event(&logger, LogEvent::new("draft_generated").with_command("draft"));

    if json {
        return output::print_json(serde_json::json!({ "text": text }));
    }

    output::info("Draft (not published):");
    println!();
    println!("{}", text);
    Ok(())
}
