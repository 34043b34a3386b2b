//! Profile command - the local identity and its activity

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use chronotalk_core::{LogEvent, User};

use super::{get_context, get_logger, log_event, truncate};
use crate::output;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the current identity
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change display name or avatar
    Edit {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New avatar URL (empty for the default avatar)
        #[arg(long)]
        avatar: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace this identity with a brand-new random one
    Switch {
        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Posts written by the current identity
    Posts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Comments written by the current identity
    Comments {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_user(user: &User) {
    println!("{}", user.name.bold());
    println!("  ID:     {}", user.id);
    println!("  Avatar: {}", user.avatar);
}

pub fn run(command: ProfileCommands) -> Result<()> {
    let mut ctx = get_context()?;
    let logger = get_logger(&ctx.context_id.to_string());

    match command {
        ProfileCommands::Show { json } => {
            if json {
                return output::print_json(ctx.feed.current_user());
            }
            print_user(ctx.feed.current_user());
        }
        ProfileCommands::Edit { name, avatar, json } => {
            if name.is_none() && avatar.is_none() {
                anyhow::bail!("Nothing to change. Use --name and/or --avatar.");
            }
            let current = ctx.feed.current_user().clone();
            let edited = User::new(
                current.id,
                name.unwrap_or(current.name),
                avatar.unwrap_or(current.avatar),
            );
            let user = ctx.feed.update_profile(edited)?;
            log_event(&logger, LogEvent::new("profile_updated").with_command("profile edit"));

            if json {
                return output::print_json(&user);
            }
            output::success("Profile updated");
            print_user(&user);
        }
        ProfileCommands::Switch { yes, json } => {
            if !yes && !json {
                println!(
                    "\n{}",
                    "This creates a brand-new identity. The current one cannot be recovered."
                        .yellow()
                );
                println!(
                    "{}\n",
                    "Posts and comments you already wrote keep their old author.".dimmed()
                );

                if !Confirm::new()
                    .with_prompt("Switch identity?")
                    .default(false)
                    .interact()?
                {
                    println!("{}\n", "Cancelled".dimmed());
                    return Ok(());
                }
            } else if !yes {
                anyhow::bail!("Switching identity with --json requires --yes");
            }

            let user = ctx.feed.switch_identity()?;
            log_event(&logger, LogEvent::new("identity_switched").with_command("profile switch"));

            if json {
                return output::print_json(&user);
            }
            output::success("Identity switched");
            print_user(&user);
        }
        ProfileCommands::Posts { json } => {
            let user_id = ctx.feed.current_user().id.clone();
            let posts = ctx.feed.posts_by(&user_id);

            if json {
                return output::print_json(&posts);
            }
            if posts.is_empty() {
                println!("You have not posted anything yet.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Title", "Likes", "Comments", "Posted"]);
            for post in &posts {
                table.add_row(vec![
                    post.id.clone(),
                    truncate(&post.title, 40),
                    post.likes.to_string(),
                    post.comments.len().to_string(),
                    output::format_timestamp(post.timestamp),
                ]);
            }
            println!("{}", table);
        }
        ProfileCommands::Comments { json } => {
            let user_id = ctx.feed.current_user().id.clone();
            let comments = ctx.feed.comments_by(&user_id);

            if json {
                return output::print_json(&comments);
            }
            if comments.is_empty() {
                println!("You have not commented on anything yet.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Post", "Comment", "When"]);
            for authored in &comments {
                table.add_row(vec![
                    truncate(&authored.post_title, 30),
                    truncate(&authored.comment.content, 50),
                    output::format_timestamp(authored.comment.timestamp),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
