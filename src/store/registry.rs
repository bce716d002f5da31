use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::{KvStore, MemoryStore, PrefixedStore, StoreConfig, StoreError};

/// Opens a store client from its settings.
pub type Connector =
    Box<dyn Fn(&StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> + Send + Sync>;

/// Maps backend names (the `KVStore` selector) to connectors.
///
/// The `memory` backend is always available. Network backends such as
/// `etcd` are registered by the application, which owns the client library.
pub struct StoreRegistry {
    connectors: BTreeMap<String, Connector>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            connectors: BTreeMap::new(),
        };
        registry.register("memory", |_| Ok(Arc::new(MemoryStore::new()) as Arc<dyn KvStore>));
        registry
    }

    /// Registers (or replaces) the connector for `backend`.
    pub fn register<F>(&mut self, backend: impl Into<String>, connector: F)
    where
        F: Fn(&StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> + Send + Sync + 'static,
    {
        self.connectors.insert(backend.into(), Box::new(connector));
    }

    pub fn contains(&self, backend: &str) -> bool {
        self.connectors.contains_key(backend)
    }

    /// Opens the backend named by `config.backend`, applying its key prefix.
    pub fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> {
        let connector = self
            .connectors
            .get(&config.backend)
            .ok_or_else(|| StoreError::UnsupportedBackend(config.backend.clone()))?;

        let store = connector(config)?;
        info!(
            backend = %config.backend,
            endpoint = %config.endpoint(),
            dev_mode = config.dev_mode,
            "connected to key-value store"
        );

        if config.prefix.is_empty() {
            Ok(store)
        } else {
            let prefixed: Arc<dyn KvStore> =
                Arc::new(PrefixedStore::new(store, config.prefix.clone()));
            Ok(prefixed)
        }
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("backends", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}
