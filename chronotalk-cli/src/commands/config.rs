//! Config command - show and change settings.json

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use chronotalk_core::config::Config;

use super::get_chronotalk_dir;
use crate::output;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a setting (model, timeout, poll-interval)
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let chronotalk_dir = get_chronotalk_dir()?;
    std::fs::create_dir_all(&chronotalk_dir)
        .with_context(|| format!("Failed to create chronotalk directory: {:?}", chronotalk_dir))?;
    let mut config = Config::load(&chronotalk_dir)?;

    match command {
        ConfigCommands::Show { json } => {
            let api_key = if config.assistant.api_key.is_some() {
                "set"
            } else {
                "not set"
            };

            if json {
                return output::print_json(serde_json::json!({
                    "model": config.assistant.model,
                    "endpoint": config.assistant.endpoint,
                    "timeoutSecs": config.assistant.timeout.as_secs(),
                    "apiKey": api_key,
                    "pollIntervalMs": config.sync_poll_interval.as_millis() as u64,
                }));
            }

            println!("{}", "Configuration".bold());
            println!("  Model:         {}", config.assistant.model);
            println!("  Endpoint:      {}", config.assistant.endpoint);
            println!("  Timeout:       {}s", config.assistant.timeout.as_secs());
            println!("  API key:       {}", api_key);
            println!("  Poll interval: {}ms", config.sync_poll_interval.as_millis());
            println!();
            println!(
                "{}",
                format!("File: {}", chronotalk_dir.join("settings.json").display()).dimmed()
            );
        }
        ConfigCommands::Set { key, value } => {
            match key.as_str() {
                "model" => {
                    if value.trim().is_empty() {
                        anyhow::bail!("Model name cannot be empty");
                    }
                    config.set_model(value.trim());
                }
                "timeout" => {
                    let secs: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid timeout '{}', expected seconds", value))?;
                    if secs == 0 {
                        anyhow::bail!("Timeout must be at least 1 second");
                    }
                    config.set_timeout(Duration::from_secs(secs));
                }
                "poll-interval" => {
                    let ms: u64 = value.parse().with_context(|| {
                        format!("Invalid poll interval '{}', expected milliseconds", value)
                    })?;
                    if ms == 0 {
                        anyhow::bail!("Poll interval must be at least 1 ms");
                    }
                    config.set_poll_interval(Duration::from_millis(ms));
                }
                other => anyhow::bail!(
                    "Unknown setting '{}'. Valid: model, timeout, poll-interval",
                    other
                ),
            }

            config.save(&chronotalk_dir)?;
            output::success(&format!("{} = {}", key, value));
        }
    }

    Ok(())
}
