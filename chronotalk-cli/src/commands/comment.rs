//! Comment command - reply to a post, optionally as the assistant

use anyhow::Result;

use chronotalk_core::services::{CancelToken, Mood};
use chronotalk_core::LogEvent;

use super::{get_context, get_logger, log_event, run_assistant, text_or_stdin};
use crate::output;

pub fn run(post_id: &str, content: Option<String>, ai: Option<String>, json: bool) -> Result<()> {
    let mood = ai.as_deref().map(str::parse::<Mood>).transpose()?;
    let mut ctx = get_context()?;
    let logger = get_logger(&ctx.context_id.to_string());
    // Subscribe before the draft so writes made while waiting are not lost
    let listener = ctx.sync_listener()?;

    let (content, is_ai_generated) = match mood {
        Some(mood) => {
            let Some(post) = ctx.feed.get_post(post_id) else {
                anyhow::bail!("Post '{}' not found", post_id);
            };
            let cancel = CancelToken::new();
            let drafted = run_assistant(
                &format!("Asking ChronoBot for a {} reply...", mood),
                &cancel,
                ctx.assistant.draft_comment(&post.content, mood, &cancel),
            );
            match drafted {
                Ok(text) => (text, true),
                Err(e) => {
                    log_event(
                        &logger,
                        LogEvent::new("assistant_failed")
                            .with_command("comment")
                            .with_post(post_id)
                            .with_error(e.to_string()),
                    );
                    return Err(e.context("Comment not added"));
                }
            }
        }
        None => (text_or_stdin(content, "comment")?, false),
    };

    listener.catch_up(&mut ctx.feed, ctx.storage.as_ref())?;
    let Some(comment) = ctx.feed.add_comment(post_id, &content, is_ai_generated)? else {
        anyhow::bail!("Post '{}' not found", post_id);
    };
    log_event(
        &logger,
        LogEvent::new("comment_added")
            .with_command("comment")
            .with_post(post_id),
    );

    if json {
        return output::print_json(&comment);
    }

    output::success(&format!(
        "Comment added by {}",
        output::format_author(&comment.author)
    ));
    if is_ai_generated {
        println!();
        println!("{}", comment.content);
    }

    Ok(())
}
