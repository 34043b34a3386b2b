//! Post command - publish a post, optionally drafted by the assistant

use anyhow::Result;

use chronotalk_core::services::CancelToken;
use chronotalk_core::LogEvent;

use super::{get_context, get_logger, log_event, parse_category, run_assistant, text_or_stdin};
use crate::output;

pub fn run(
    title: &str,
    content: Option<String>,
    category: &str,
    ai: bool,
    json: bool,
) -> Result<()> {
    let category = parse_category(category)?;
    let mut ctx = get_context()?;
    let logger = get_logger(&ctx.context_id.to_string());

    // Subscribe before the draft so writes made while waiting are not lost
    let listener = ctx.sync_listener()?;

    let content = if ai {
        let cancel = CancelToken::new();
        let drafted = run_assistant(
            "Drafting with the assistant...",
            &cancel,
            ctx.assistant.draft_post(title, category, &cancel),
        );
        match drafted {
            Ok(text) => text,
            Err(e) => {
                log_event(
                    &logger,
                    LogEvent::new("assistant_failed")
                        .with_command("post")
                        .with_error(e.to_string()),
                );
                return Err(e.context("Post not created"));
            }
        }
    } else {
        text_or_stdin(content, "post content")?
    };

    listener.catch_up(&mut ctx.feed, ctx.storage.as_ref())?;
    let post = ctx.feed.create_post(title, &content, category)?;
    log_event(
        &logger,
        LogEvent::new("post_created")
            .with_command("post")
            .with_post(&post.id),
    );

    if json {
        return output::print_json(&post);
    }

    output::success(&format!("Posted '{}' ({})", post.title, post.id));
    if ai {
        println!();
        println!("{}", post.content);
    }

    Ok(())
}
