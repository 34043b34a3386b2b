//! In-process shared storage medium
//!
//! A `MemoryMedium` plays the role of the browser's per-origin storage: every
//! `MemoryStorage` handed out by `context()` is an independent context that
//! sees the same items, and each write is announced to the subscribers of
//! every *other* context.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::ports::{DurableStore, StorageEvent, StorageEvents};

#[derive(Default)]
struct MediumState {
    items: HashMap<String, String>,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    context_id: Uuid,
    sender: Sender<StorageEvent>,
}

/// Shared medium; clones refer to the same items
#[derive(Clone, Default)]
pub struct MemoryMedium {
    state: Arc<Mutex<MediumState>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new context on this medium
    pub fn context(&self) -> MemoryStorage {
        MemoryStorage {
            context_id: Uuid::new_v4(),
            state: Arc::clone(&self.state),
        }
    }
}

/// One context's handle on a `MemoryMedium`
pub struct MemoryStorage {
    context_id: Uuid,
    state: Arc<Mutex<MediumState>>,
}

impl MemoryStorage {
    fn lock(&self) -> Result<MutexGuard<'_, MediumState>> {
        self.state
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }

    fn publish(&self, state: &mut MediumState, key: &str, new_value: Option<&str>) {
        let event = StorageEvent {
            key: key.to_string(),
            new_value: new_value.map(str::to_string),
        };
        let origin = self.context_id;
        // Own-context subscribers are skipped; disconnected ones are dropped.
        state
            .subscribers
            .retain(|s| s.context_id == origin || s.sender.send(event.clone()).is_ok());
    }
}

impl DurableStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.items.insert(key.to_string(), value.to_string());
        self.publish(&mut state, key, Some(value));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut state = self.lock()?;
        if state.items.remove(key).is_some() {
            self.publish(&mut state, key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> Result<StorageEvents> {
        let (sender, receiver) = channel();
        self.lock()?.subscribers.push(Subscriber {
            context_id: self.context_id,
            sender,
        });
        Ok(StorageEvents::new(receiver))
    }
}
