//! Sync listener - cross-context reconciliation of the post feed
//!
//! Listens to writes other contexts make on the shared store and replaces
//! the local feed with the latest value (last-writer-wins, no merge). The
//! identity key is deliberately ignored: each context keeps its own.

use std::time::Duration;

use crate::domain::result::Result;
use crate::domain::Post;
use crate::ports::{DurableStore, StorageEvent, StorageEvents};
use crate::services::feed::{FeedStore, POSTS_KEY};

/// What a single notification did to the local feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Feed replaced with the new value
    Applied { posts: usize },
    /// Key removed elsewhere; feed is now empty
    Cleared,
    /// Value could not be parsed; feed unchanged
    Rejected { reason: String },
    /// Some other key; nothing to do
    Ignored { key: String },
}

/// Consumes change notifications for one context
pub struct SyncListener {
    events: StorageEvents,
}

impl SyncListener {
    pub fn new(events: StorageEvents) -> Self {
        Self { events }
    }

    /// Subscribe to `storage` and listen on that subscription
    pub fn attach(storage: &dyn DurableStore) -> Result<Self> {
        Ok(Self::new(storage.subscribe()?))
    }

    /// Apply one notification to `store`
    pub fn apply(store: &mut FeedStore, event: &StorageEvent) -> SyncOutcome {
        if event.key != POSTS_KEY {
            return SyncOutcome::Ignored {
                key: event.key.clone(),
            };
        }

        let Some(raw) = event.new_value.as_deref() else {
            tracing::info!("posts removed by another context, clearing feed");
            store.reconcile_posts(Vec::new());
            return SyncOutcome::Cleared;
        };

        match serde_json::from_str::<Vec<Post>>(raw) {
            Ok(posts) => {
                let count = posts.len();
                store.reconcile_posts(posts);
                tracing::debug!(posts = count, "feed reconciled from another context");
                SyncOutcome::Applied { posts: count }
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed posts written by another context");
                SyncOutcome::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Apply every pending notification in arrival order
    ///
    /// Coalesced bursts end on the latest value.
    pub fn poll(&self, store: &mut FeedStore) -> Vec<SyncOutcome> {
        self.events
            .drain()
            .iter()
            .map(|event| Self::apply(store, event))
            .collect()
    }

    /// Apply pending notifications, then the value currently stored
    ///
    /// Picks up writes the subscription has not reported yet, so a mutation
    /// made right after a long wait starts from the latest feed.
    pub fn catch_up(
        &self,
        store: &mut FeedStore,
        storage: &dyn DurableStore,
    ) -> Result<Vec<SyncOutcome>> {
        let mut outcomes = self.poll(store);

        let current = storage.get_item(POSTS_KEY)?;
        let local = serde_json::to_string(store.posts())?;
        let in_sync = match current.as_deref() {
            Some(raw) => raw == local,
            None => store.posts().is_empty(),
        };
        if !in_sync {
            let event = StorageEvent {
                key: POSTS_KEY.to_string(),
                new_value: current,
            };
            outcomes.push(Self::apply(store, &event));
        }
        Ok(outcomes)
    }

    /// Wait up to `timeout` for one notification and apply it
    pub fn wait(&self, store: &mut FeedStore, timeout: Duration) -> Option<SyncOutcome> {
        self.events
            .next_timeout(timeout)
            .map(|event| Self::apply(store, &event))
    }
}
