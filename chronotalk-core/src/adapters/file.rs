//! File-backed durable store
//!
//! Each key lives in `<dir>/<key>.json`. Writers serialize on an exclusive
//! lock over `<dir>/.chronotalk.lock` and replace files atomically, so
//! readers in other processes never observe a partial value.
//!
//! Change notifications come from a polling watcher that fingerprints every
//! key file. Values this handle wrote itself are remembered per subscription
//! until that watcher's next poll and never echoed back to it.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};
use crate::ports::{DurableStore, StorageEvent, StorageEvents};

const LOCK_FILE: &str = ".chronotalk.lock";
const KEY_SUFFIX: &str = ".json";

type Fingerprint = [u8; 32];

/// Last value this handle wrote per key since a watcher's last poll
/// (`None` = removed)
type OwnWrites = Mutex<HashMap<String, Option<Fingerprint>>>;

fn fingerprint(value: &str) -> Fingerprint {
    Sha256::digest(value.as_bytes()).into()
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("Invalid storage key: {:?}", key)))
    }
}

type Snapshot = HashMap<String, (Fingerprint, String)>;

/// Current value of every key file in `dir`
fn snapshot(dir: &Path) -> Snapshot {
    let mut values = HashMap::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return values;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let Some(key) = name.strip_suffix(KEY_SUFFIX) else {
            continue;
        };
        // A file can vanish between read_dir and read; the next poll sees it.
        if let Ok(content) = fs::read_to_string(entry.path()) {
            values.insert(key.to_string(), (fingerprint(&content), content));
        }
    }

    values
}

fn open_lock(dir: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))?;
    Ok(file)
}

/// Snapshot plus the own writes it covers, both taken under the shared lock
///
/// Every remembered write finished before the snapshot, so anything not
/// matched by it is superseded and can be dropped.
fn poll_once(
    dir: &Path,
    own_writes: &OwnWrites,
) -> Result<(Snapshot, HashMap<String, Option<Fingerprint>>)> {
    let lock = open_lock(dir)?;
    FileExt::lock_shared(&lock)?;
    let values = snapshot(dir);
    let own = own_writes
        .lock()
        .map(|mut own| std::mem::take(&mut *own))
        .unwrap_or_default();
    FileExt::unlock(&lock)?;
    Ok((values, own))
}

/// Directory-backed store; one handle is one context
pub struct FileStorage {
    dir: PathBuf,
    poll_interval: Duration,
    watchers: Mutex<Vec<Weak<OwnWrites>>>,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn new(dir: &Path, poll_interval: Duration) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            poll_interval,
            watchers: Mutex::new(Vec::new()),
        })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}{}", key, KEY_SUFFIX)))
    }

    fn open_lock(&self) -> Result<File> {
        open_lock(&self.dir)
    }

    fn remember(&self, key: &str, value: Option<Fingerprint>) -> Result<()> {
        let mut watchers = self
            .watchers
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))?;
        watchers.retain(|w| w.strong_count() > 0);
        for own in watchers.iter().filter_map(Weak::upgrade) {
            if let Ok(mut own) = own.lock() {
                own.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Drop a remembered value whose write did not happen
    fn forget(&self, key: &str, value: Option<Fingerprint>) {
        let Ok(watchers) = self.watchers.lock() else {
            return;
        };
        for own in watchers.iter().filter_map(Weak::upgrade) {
            if let Ok(mut own) = own.lock() {
                if own.get(key) == Some(&value) {
                    own.remove(key);
                }
            }
        }
    }
}

impl DurableStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)?;

        let result = match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(format!("Failed to read {}: {}", path.display(), e))),
        };

        FileExt::unlock(&lock)?;
        result
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)?;

        let result = (|| -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.as_file().sync_all()?;
            // Recorded before the rename so the watcher can never see the
            // new value without knowing it is ours.
            let fp = fingerprint(value);
            self.remember(key, Some(fp))?;
            if let Err(e) = tmp.persist(&path) {
                self.forget(key, Some(fp));
                return Err(Error::storage(format!(
                    "Failed to replace {}: {}",
                    path.display(),
                    e.error
                )));
            }
            Ok(())
        })();

        FileExt::unlock(&lock)?;
        result
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)?;

        let result = self.remember(key, None).and_then(|_| match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                self.forget(key, None);
                Err(Error::storage(format!("Failed to remove {}: {}", path.display(), e)))
            }
        });

        FileExt::unlock(&lock)?;
        result
    }

    fn subscribe(&self) -> Result<StorageEvents> {
        let (sender, receiver) = channel();
        let stop = Arc::new(AtomicBool::new(false));

        let own_writes: Arc<OwnWrites> = Arc::new(Mutex::new(HashMap::new()));

        // Registered under the lock together with the first snapshot, so a
        // write is either in the snapshot or remembered for this watcher
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)?;
        let initial = snapshot(&self.dir);
        let registered = self
            .watchers
            .lock()
            .map(|mut watchers| watchers.push(Arc::downgrade(&own_writes)))
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)));
        FileExt::unlock(&lock)?;
        registered?;

        let mut seen: HashMap<String, Fingerprint> = initial
            .into_iter()
            .map(|(key, (fp, _))| (key, fp))
            .collect();

        let dir = self.dir.clone();
        let interval = self.poll_interval;
        let watcher_stop = Arc::clone(&stop);

        thread::Builder::new()
            .name("chronotalk-storage-watch".to_string())
            .spawn(move || {
                tracing::debug!(dir = %dir.display(), "storage watcher started");
                while !watcher_stop.load(Ordering::SeqCst) {
                    thread::sleep(interval);

                    let (current, own) = match poll_once(&dir, &own_writes) {
                        Ok(polled) => polled,
                        Err(e) => {
                            tracing::debug!(error = %e, "storage poll skipped");
                            continue;
                        }
                    };

                    let keys: HashSet<String> =
                        seen.keys().chain(current.keys()).cloned().collect();

                    for key in keys {
                        let now = current.get(&key);
                        let now_fp = now.map(|(fp, _)| *fp);
                        if seen.get(&key).copied() == now_fp {
                            continue;
                        }
                        match now_fp {
                            Some(fp) => seen.insert(key.clone(), fp),
                            None => seen.remove(&key),
                        };

                        if own.get(&key) == Some(&now_fp) {
                            continue;
                        }

                        let event = StorageEvent {
                            key,
                            new_value: now.map(|(_, value)| value.clone()),
                        };
                        if sender.send(event).is_err() {
                            return;
                        }
                    }
                }
                tracing::debug!("storage watcher stopped");
            })?;

        Ok(StorageEvents::with_stop_flag(receiver, stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const POLL: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), POLL).unwrap();

        assert_eq!(storage.get_item("posts").unwrap(), None);
        storage.set_item("posts", "[]").unwrap();
        assert_eq!(storage.get_item("posts").unwrap(), Some("[]".to_string()));
        assert!(dir.path().join("posts.json").exists());

        storage.remove_item("posts").unwrap();
        storage.remove_item("posts").unwrap();
        assert_eq!(storage.get_item("posts").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path(), POLL).unwrap();

        assert!(matches!(storage.set_item("../escape", "x"), Err(Error::Validation(_))));
        assert!(matches!(storage.get_item(".chronotalk"), Err(Error::Validation(_))));
        assert!(matches!(storage.get_item(""), Err(Error::Validation(_))));
    }

    #[test]
    fn test_watcher_reports_other_handles() {
        let dir = tempdir().unwrap();
        let a = FileStorage::new(dir.path(), POLL).unwrap();
        let b = FileStorage::new(dir.path(), POLL).unwrap();
        let b_events = b.subscribe().unwrap();

        a.set_item("posts", "[1]").unwrap();

        let event = b_events.next_timeout(WAIT).expect("no event delivered");
        assert_eq!(event.key, "posts");
        assert_eq!(event.new_value, Some("[1]".to_string()));
    }

    #[test]
    fn test_watcher_skips_own_writes() {
        let dir = tempdir().unwrap();
        let a = FileStorage::new(dir.path(), POLL).unwrap();
        let b = FileStorage::new(dir.path(), POLL).unwrap();
        let a_events = a.subscribe().unwrap();

        a.set_item("posts", "[1]").unwrap();
        b.set_item("user", "{}").unwrap();

        let event = a_events.next_timeout(WAIT).expect("no event delivered");
        assert_eq!(event.key, "user");
        assert!(a_events.next_timeout(POLL * 5).is_none());
    }

    #[test]
    fn test_watcher_reports_removal() {
        let dir = tempdir().unwrap();
        let a = FileStorage::new(dir.path(), POLL).unwrap();
        a.set_item("posts", "[]").unwrap();
        let b = FileStorage::new(dir.path(), POLL).unwrap();
        let b_events = b.subscribe().unwrap();

        a.remove_item("posts").unwrap();

        let event = b_events.next_timeout(WAIT).expect("no event delivered");
        assert_eq!(event.new_value, None);
    }

    #[test]
    fn test_each_subscription_skips_own_writes() {
        let dir = tempdir().unwrap();
        let a = FileStorage::new(dir.path(), POLL).unwrap();
        let b = FileStorage::new(dir.path(), POLL).unwrap();
        let first = a.subscribe().unwrap();
        let second = a.subscribe().unwrap();

        a.set_item("posts", "[1]").unwrap();
        b.set_item("user", "{}").unwrap();

        for events in [&first, &second] {
            let event = events.next_timeout(WAIT).expect("no event delivered");
            assert_eq!(event.key, "user");
            assert!(events.next_timeout(POLL * 5).is_none());
        }
    }

    #[test]
    fn test_own_value_written_again_by_other_is_reported() {
        let dir = tempdir().unwrap();
        let a = FileStorage::new(dir.path(), POLL).unwrap();
        let b = FileStorage::new(dir.path(), POLL).unwrap();
        let a_events = a.subscribe().unwrap();

        a.set_item("posts", "[1]").unwrap();
        b.set_item("posts", "[2]").unwrap();
        let event = a_events.next_timeout(WAIT).expect("no event delivered");
        assert_eq!(event.new_value, Some("[2]".to_string()));

        b.set_item("posts", "[1]").unwrap();
        let event = a_events.next_timeout(WAIT).expect("no event delivered");
        assert_eq!(event.new_value, Some("[1]".to_string()));
    }

    #[test]
    fn test_failed_write_is_not_remembered() {
        let dir = tempdir().unwrap();
        let a = FileStorage::new(dir.path(), POLL).unwrap();
        let b = FileStorage::new(dir.path(), POLL).unwrap();
        let a_events = a.subscribe().unwrap();

        // A non-empty directory in the way makes the rename fail
        let blocker = dir.path().join("posts.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();
        assert!(matches!(a.set_item("posts", "[1]"), Err(Error::Storage(_))));
        fs::remove_dir_all(&blocker).unwrap();

        b.set_item("posts", "[1]").unwrap();
        let event = a_events.next_timeout(WAIT).expect("no event delivered");
        assert_eq!(event.key, "posts");
        assert_eq!(event.new_value, Some("[1]".to_string()));
    }
}
