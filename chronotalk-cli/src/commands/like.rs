//! Like command

use anyhow::Result;
use colored::Colorize;

use chronotalk_core::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

pub fn run(post_id: &str, times: u32, json: bool) -> Result<()> {
    if times == 0 {
        anyhow::bail!("--times must be at least 1");
    }

    let mut ctx = get_context()?;
    let logger = get_logger(&ctx.context_id.to_string());

    let mut likes = None;
    for _ in 0..times {
        likes = ctx.feed.like_post(post_id)?;
        if likes.is_none() {
            break;
        }
    }
    let Some(likes) = likes else {
        anyhow::bail!("Post '{}' not found", post_id);
    };

    log_event(
        &logger,
        LogEvent::new("post_liked")
            .with_command("like")
            .with_post(post_id),
    );

    if json {
        return output::print_json(serde_json::json!({ "postId": post_id, "likes": likes }));
    }

    output::success(&format!("{} {}", "♥".red(), likes));
    Ok(())
}
