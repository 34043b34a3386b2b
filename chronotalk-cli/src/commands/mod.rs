//! CLI command implementations

pub mod comment;
pub mod config;
pub mod draft;
pub mod feed;
pub mod like;
pub mod logs;
pub mod post;
pub mod profile;
pub mod show;
pub mod status;
pub mod watch;

use std::future::Future;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use chronotalk_core::services::CancelToken;
use chronotalk_core::{Category, ChronoTalkContext, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(context_id: &str) -> Option<LoggingService> {
    let chronotalk_dir = get_chronotalk_dir().ok()?;
    std::fs::create_dir_all(&chronotalk_dir).ok()?;
    LoggingService::new(&chronotalk_dir, context_id, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "failed to record log event");
        }
    }
}

/// Get the chronotalk directory from environment or default
pub fn get_chronotalk_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CHRONOTALK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".chronotalk"))
        .context("Could not find home directory; set CHRONOTALK_DIR")
}

/// Open this invocation's context on the shared store
pub fn get_context() -> Result<ChronoTalkContext> {
    let chronotalk_dir = get_chronotalk_dir()?;

    std::fs::create_dir_all(&chronotalk_dir).with_context(|| {
        format!("Failed to create chronotalk directory: {:?}", chronotalk_dir)
    })?;

    ChronoTalkContext::new(&chronotalk_dir).context("Failed to initialize chronotalk context")
}

pub fn parse_category(value: &str) -> Result<Category> {
    Ok(value.parse::<Category>()?)
}

/// Text from the argument, or from stdin when it is piped
pub fn text_or_stdin(arg: Option<String>, what: &str) -> Result<String> {
    if let Some(text) = arg {
        return Ok(text);
    }
    if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .with_context(|| format!("Failed to read {} from stdin", what))?;
        return Ok(buffer.trim_end().to_string());
    }
    anyhow::bail!("No {} provided. Pass it as an argument or pipe it from stdin.", what)
}

/// Drive an assistant request to completion behind a spinner
///
/// Ctrl+C cancels the request instead of killing the process.
pub fn run_assistant<T>(
    message: &str,
    cancel: &CancelToken,
    request: impl Future<Output = chronotalk_core::domain::result::Result<T>>,
) -> Result<T> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = runtime.block_on(async {
        let canceller = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                canceller.cancel();
            }
        });
        let outcome = request.await;
        interrupt.abort();
        outcome
    });

    spinner.finish_and_clear();
    Ok(result?)
}

/// Shorten `text` to at most `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
