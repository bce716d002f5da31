use std::sync::Arc;
use std::time::Duration;

use super::{KeyValue, KvStore, StoreError, StreamPoll, WatchStream};

/// Namespaces every key of an inner store under a fixed prefix.
///
/// Callers keep using the plain layout (`/<AppName>/config`, ...); the
/// prefix is added on the way in and stripped from returned keys and watch
/// events on the way out.
#[derive(Debug, Clone)]
pub struct PrefixedStore {
    inner: Arc<dyn KvStore>,
    prefix: String,
}

impl PrefixedStore {
    pub fn new(inner: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl KvStore for PrefixedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(&self.full_key(key))
    }

    fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>, StoreError> {
        Ok(self
            .inner
            .get_prefix(&self.full_key(prefix))?
            .into_iter()
            .map(|kv| KeyValue {
                key: strip(&self.prefix, kv.key),
                value: kv.value,
            })
            .collect())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.put(&self.full_key(key), value)
    }

    fn watch(&self, key: &str) -> Result<Box<dyn WatchStream>, StoreError> {
        let stream = self.inner.watch(&self.full_key(key))?;
        Ok(Box::new(StripPrefix {
            inner: stream,
            prefix: self.prefix.clone(),
        }))
    }

    fn watch_prefix(&self, prefix: &str) -> Result<Box<dyn WatchStream>, StoreError> {
        let stream = self.inner.watch_prefix(&self.full_key(prefix))?;
        Ok(Box::new(StripPrefix {
            inner: stream,
            prefix: self.prefix.clone(),
        }))
    }
}

fn strip(prefix: &str, key: String) -> String {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => key,
    }
}

struct StripPrefix {
    inner: Box<dyn WatchStream>,
    prefix: String,
}

impl WatchStream for StripPrefix {
    fn poll(&mut self, wait: Duration) -> StreamPoll {
        match self.inner.poll(wait) {
            StreamPoll::Event(mut event) => {
                event.key = strip(&self.prefix, event.key);
                StreamPoll::Event(event)
            }
            other => other,
        }
    }
}
