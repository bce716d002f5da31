//! In-process store backend.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{
    load_seed_file, EventKind, KeyValue, KvStore, RawEvent, StoreError, StreamPoll, WatchStream,
};

/// A [`KvStore`] held entirely in memory.
///
/// Writes are fanned out to every watch registration whose key (or prefix)
/// matches. Streams stay open until [`close_watches`](Self::close_watches) is
/// called or the store is dropped. Dropping a stream removes its
/// registration.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    watches: Arc<Mutex<Vec<Registration>>>,
    next_watch_id: AtomicU64,
}

#[derive(Debug)]
struct Registration {
    id: u64,
    target: String,
    prefix: bool,
    tx: Sender<RawEvent>,
}

impl Registration {
    fn matches(&self, key: &str) -> bool {
        if self.prefix {
            key.starts_with(&self.target)
        } else {
            key == self.target
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Creates a store provisioned from a seed file that must exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self::new();
        store.load_file(path, true)?;
        Ok(store)
    }

    /// Puts every entry of a seed file into the store.
    ///
    /// Returns the number of entries written; a missing optional file writes
    /// nothing.
    pub fn load_file(&self, path: impl AsRef<Path>, required: bool) -> Result<usize, StoreError> {
        let Some(entries) = load_seed_file(path, required)? else {
            return Ok(0);
        };
        let count = entries.len();
        for (key, value) in entries {
            self.put(&key, &value)?;
        }
        Ok(count)
    }

    /// Removes `key`, notifying watchers. Returns whether the key existed.
    pub fn delete(&self, key: &str) -> bool {
        let existed = self.entries.write().remove(key).is_some();
        if existed {
            self.notify(RawEvent {
                kind: EventKind::Delete,
                key: key.to_string(),
                value: Vec::new(),
            });
        }
        existed
    }

    /// Ends every open watch stream.
    pub fn close_watches(&self) {
        self.watches.lock().clear();
    }

    fn notify(&self, event: RawEvent) {
        self.watches.lock().retain(|reg| {
            if !reg.matches(&event.key) {
                return true;
            }
            // A dropped receiver means the watcher is gone; forget it.
            reg.tx.send(event.clone()).is_ok()
        });
    }

    fn register(&self, target: &str, prefix: bool) -> Box<dyn WatchStream> {
        let (tx, rx) = mpsc::channel();
        let id = self.next_watch_id.fetch_add(1, Ordering::Relaxed);
        self.watches.lock().push(Registration {
            id,
            target: target.to_string(),
            prefix,
            tx,
        });
        debug!(key = target, prefix, id, "registered memory store watch");
        Box::new(MemoryStream {
            rx,
            id,
            watches: Arc::downgrade(&self.watches),
        })
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>, StoreError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.clone(),
            })
            .collect())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        self.notify(RawEvent {
            kind: EventKind::Put,
            key: key.to_string(),
            value: value.as_bytes().to_vec(),
        });
        Ok(())
    }

    fn watch(&self, key: &str) -> Result<Box<dyn WatchStream>, StoreError> {
        Ok(self.register(key, false))
    }

    fn watch_prefix(&self, prefix: &str) -> Result<Box<dyn WatchStream>, StoreError> {
        Ok(self.register(prefix, true))
    }
}

struct MemoryStream {
    rx: Receiver<RawEvent>,
    id: u64,
    watches: Weak<Mutex<Vec<Registration>>>,
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        if let Some(watches) = self.watches.upgrade() {
            watches.lock().retain(|reg| reg.id != self.id);
        }
    }
}

impl WatchStream for MemoryStream {
    fn poll(&mut self, wait: Duration) -> StreamPoll {
        match self.rx.recv_timeout(wait) {
            Ok(event) => StreamPoll::Event(event),
            Err(RecvTimeoutError::Timeout) => StreamPoll::Idle,
            Err(RecvTimeoutError::Disconnected) => StreamPoll::Closed,
        }
    }
}
