//! Status command - feed totals, identity and storage location

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{get_chronotalk_dir, get_context};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let stats = ctx.feed.stats();
    let user = ctx.feed.current_user();
    let storage_dir = get_chronotalk_dir()?.join("storage");

    if json {
        return output::print_json(serde_json::json!({
            "stats": stats,
            "user": user,
            "assistantAvailable": ctx.assistant.is_available(),
            "assistantError": ctx.assistant.unavailable_reason(),
            "storageDir": storage_dir.to_string_lossy(),
        }));
    }

    println!("{}", "ChronoTalk Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Posts", &stats.posts.to_string()]);
    table.add_row(vec!["Comments", &stats.comments.to_string()]);
    table.add_row(vec!["Likes", &stats.likes.to_string()]);
    table.add_row(vec!["Signed in as", &format!("{} ({})", user.name, user.id)]);

    let assistant = match ctx.assistant.unavailable_reason() {
        None => "ready".green().to_string(),
        Some(reason) => reason.yellow().to_string(),
    };
    table.add_row(vec!["Assistant", &assistant]);

    println!("{}", table);
    println!();
    println!("{}", format!("Storage: {}", storage_dir.display()).dimmed());

    Ok(())
}
