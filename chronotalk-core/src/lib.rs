//! ChronoTalk Core - a local-first social feed about time management
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Post, Comment, User, Category)
//! - **ports**: Trait definitions for external dependencies (DurableStore, TextGenerator, Clock)
//! - **services**: Business logic orchestration (feed store, sync listener, assistant, event log)
//! - **adapters**: Concrete implementations (file store, in-memory store, Gemini)

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use adapters::file::FileStorage;
use config::Config;
use ports::{DurableStore, SystemClock};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{AuthoredComment, Category, Comment, Post, User};
pub use services::{LogEvent, LoggingService};

/// Main context for ChronoTalk operations
///
/// One context is one participant in the shared store: it owns an in-memory
/// copy of the feed and its own identity. Several contexts (processes or
/// handles) may share the same store.
pub struct ChronoTalkContext {
    pub config: Config,
    pub context_id: Uuid,
    pub storage: Arc<dyn DurableStore>,
    pub feed: FeedStore,
    pub assistant: AssistantService,
}

impl ChronoTalkContext {
    /// Open a context backed by `<chronotalk_dir>/storage`
    pub fn new(chronotalk_dir: &Path) -> Result<Self> {
        let config = Config::load(chronotalk_dir)?;
        let storage: Arc<dyn DurableStore> = Arc::new(FileStorage::new(
            &chronotalk_dir.join("storage"),
            config.sync_poll_interval,
        )?);
        Self::with_storage(config, storage)
    }

    /// Open a context over an arbitrary store
    pub fn with_storage(config: Config, storage: Arc<dyn DurableStore>) -> Result<Self> {
        let feed = FeedStore::open(Arc::clone(&storage), Arc::new(SystemClock));
        let assistant = AssistantService::from_config(&config.assistant);

        Ok(Self {
            config,
            context_id: Uuid::new_v4(),
            storage,
            feed,
            assistant,
        })
    }

    /// Start listening for writes other contexts make to the shared store
    pub fn sync_listener(&self) -> Result<SyncListener> {
        Ok(SyncListener::attach(self.storage.as_ref())?)
    }
}
