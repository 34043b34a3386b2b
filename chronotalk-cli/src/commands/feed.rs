//! Feed command - list posts, newest first

use anyhow::Result;
use colored::Colorize;

use super::{get_context, parse_category, truncate};
use crate::output;

pub fn run(category: Option<String>, search: Option<String>, json: bool) -> Result<()> {
    let category = category.as_deref().map(parse_category).transpose()?;
    let ctx = get_context()?;
    let posts = ctx.feed.filter_posts(category, search.as_deref().unwrap_or(""));

    if json {
        return output::print_json(&posts);
    }

    if posts.is_empty() {
        if ctx.feed.posts().is_empty() {
            println!("The feed is empty. Start it with 'ct post <title>'.");
        } else {
            println!("No posts match.");
        }
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Category", "Title", "Author", "Likes", "Comments", "Posted"]);

    for post in &posts {
        table.add_row(vec![
            post.id.clone(),
            post.category.label().to_string(),
            truncate(&post.title, 40),
            post.author.name.clone(),
            post.likes.to_string(),
            post.comments.len().to_string(),
            output::format_timestamp(post.timestamp),
        ]);
    }

    println!("{}", table);
    println!(
        "{}",
        format!("{} of {} posts", posts.len(), ctx.feed.posts().len()).dimmed()
    );

    Ok(())
}
