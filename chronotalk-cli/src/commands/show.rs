//! Show command - one post with its comments

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(post_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let Some(post) = ctx.feed.get_post(post_id) else {
        anyhow::bail!("Post '{}' not found", post_id);
    };

    if json {
        return output::print_json(post);
    }

    println!("{}", post.title.bold());
    println!(
        "{}",
        format!(
            "{} · {} · {} · ♥ {}",
            post.author.name,
            post.category.label(),
            output::format_timestamp(post.timestamp),
            post.likes
        )
        .dimmed()
    );
    println!();
    println!("{}", post.content);
    println!();

    if post.comments.is_empty() {
        println!("{}", "No comments yet.".dimmed());
        return Ok(());
    }

    println!("{}", format!("Comments ({})", post.comments.len()).bold());
    for comment in &post.comments {
        println!(
            "  {} {}",
            output::format_author(&comment.author).cyan(),
            output::format_timestamp(comment.timestamp).dimmed()
        );
        for line in comment.content.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}
