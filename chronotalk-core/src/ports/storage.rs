//! Durable store port - shared key-value medium

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::result::Result;

/// A write observed on the shared medium
///
/// `new_value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

/// Durable key-value store shared by several contexts
///
/// Writes are whole-value replacements. Implementations must never deliver
/// a context's own writes to that context's subscriptions.
pub trait DurableStore: Send + Sync {
    /// Read a value, `None` when unset
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Subscribe to writes made by other contexts, across all keys
    fn subscribe(&self) -> Result<StorageEvents>;
}

/// Receiving end of a change subscription
///
/// Dropping it ends the subscription; adapters that run a background
/// watcher observe the shared stop flag.
pub struct StorageEvents {
    receiver: Receiver<StorageEvent>,
    stop: Arc<AtomicBool>,
}

impl StorageEvents {
    pub fn new(receiver: Receiver<StorageEvent>) -> Self {
        Self {
            receiver,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Same as `new`, sharing a stop flag with a watcher
    pub fn with_stop_flag(receiver: Receiver<StorageEvent>, stop: Arc<AtomicBool>) -> Self {
        Self { receiver, stop }
    }

    /// Next pending event without blocking
    pub fn try_next(&self) -> Option<StorageEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block for at most `timeout` waiting for the next event
    pub fn next_timeout(&self, timeout: Duration) -> Option<StorageEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// All pending events, in arrival order
    pub fn drain(&self) -> Vec<StorageEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

impl Drop for StorageEvents {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
