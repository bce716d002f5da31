//! Key-value store client interface and the bundled backends.
//!
//! The resolver never talks to a concrete store directly. It goes through
//! [`KvStore`], whose reads are synchronous and whose watches hand back a
//! [`WatchStream`] that the [`watch`](crate::watch) module drains on a
//! background thread.

mod config;
mod error;
mod file;
mod memory;
mod prefixed;
mod registry;

use std::fmt;
use std::time::Duration;

pub use config::StoreConfig;
pub use error::StoreError;
pub use file::load_seed_file;
pub use memory::MemoryStore;
pub use prefixed::PrefixedStore;
pub use registry::{Connector, StoreRegistry};

/// A key and its stored value, as returned by a prefix scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// What happened to a watched key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Put,
    Delete,
}

/// An undecoded change notification as delivered by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub key: String,
    pub value: Vec<u8>,
}

/// Result of one blocking read on a [`WatchStream`].
#[derive(Debug)]
pub enum StreamPoll {
    Event(RawEvent),
    /// Nothing arrived within the wait interval.
    Idle,
    /// The stream ended; no further events will arrive.
    Closed,
}

/// A persistent stream of change events for one watch registration.
pub trait WatchStream: Send {
    /// Blocks for at most `wait` waiting for the next event.
    fn poll(&mut self, wait: Duration) -> StreamPoll;
}

/// Client interface to the central key-value store.
pub trait KvStore: Send + Sync + fmt::Debug {
    /// Returns the value stored at `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns every entry whose key starts with `prefix`, ordered by key.
    fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>, StoreError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn watch(&self, key: &str) -> Result<Box<dyn WatchStream>, StoreError>;

    fn watch_prefix(&self, prefix: &str) -> Result<Box<dyn WatchStream>, StoreError>;
}
