use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Context, Mode};
use crate::config::Environment;
use crate::store::{KvStore, StoreConfig, StoreError, StoreRegistry};
use crate::value::{ConfigDocument, ConfigValue};
use crate::Error;

const GLOBAL_ENV_KEY: &str = "/GlobalEnv/";

/// Builder for bootstrapping a [`Context`].
///
/// By default the environment is captured from the process and the store is
/// opened through the [`StoreRegistry`] using the `KVStore` selector.
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ContextBuilder {
    env: Option<Environment>,
    store: Option<Arc<dyn KvStore>>,
    registry: StoreRegistry,
    export_global_env: bool,
}

impl ContextBuilder {
    pub(super) fn new() -> Self {
        Self {
            env: None,
            store: None,
            registry: StoreRegistry::new(),
            export_global_env: true,
        }
    }

    /// Uses `env` instead of a snapshot of the process environment.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Uses an already connected store, bypassing the registry.
    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registers a connector for a store backend selectable via `KVStore`.
    pub fn with_backend<F>(mut self, backend: impl Into<String>, connector: F) -> Self
    where
        F: Fn(&StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> + Send + Sync + 'static,
    {
        self.registry.register(backend, connector);
        self
    }

    /// Whether `/GlobalEnv/` entries are also exported to the process
    /// environment (default `true`). They are always merged into the
    /// context's own environment snapshot.
    pub fn export_global_env(mut self, export: bool) -> Self {
        self.export_global_env = export;
        self
    }

    /// Runs the bootstrap sequence.
    ///
    /// Fails without touching the store if `AppName` is unset. Missing or
    /// malformed `interfaces`/`config` documents are fatal; a missing
    /// `/GlobalEnv/` is only logged.
    pub fn build(self) -> Result<Context, Error> {
        let mut env = self.env.unwrap_or_else(Environment::from_process);

        let app_name = env
            .get_non_empty("AppName")
            .ok_or(Error::MissingAppName)?
            .trim()
            .to_string();
        let mode = Mode::from_env(&env)?;

        let store = match self.store {
            Some(store) => store,
            None => {
                let store_config = StoreConfig::from_env(&app_name, mode.is_dev(), &env)?;
                self.registry.connect(&store_config)?
            }
        };

        apply_global_env(store.as_ref(), &mut env, self.export_global_env)?;

        let interfaces = fetch_document(store.as_ref(), &format!("/{app_name}/interfaces"))?;
        let app_config = fetch_document(store.as_ref(), &format!("/{app_name}/config"))?;

        info!(app = %app_name, %mode, "configuration context ready");

        Ok(Context {
            app_name,
            mode,
            env,
            app_config,
            interfaces,
            store,
        })
    }
}

fn fetch_document(store: &dyn KvStore, key: &str) -> Result<ConfigDocument, Error> {
    let text = store
        .get(key)?
        .ok_or_else(|| Error::NotFound(key.to_string()))?;
    ConfigDocument::parse(&text).map_err(|e| Error::malformed(key, e))
}

fn apply_global_env(store: &dyn KvStore, env: &mut Environment, export: bool) -> Result<(), Error> {
    let Some(text) = store.get(GLOBAL_ENV_KEY)? else {
        warn!(key = GLOBAL_ENV_KEY, "global environment not found in store");
        return Ok(());
    };

    let doc = ConfigDocument::parse(&text).map_err(|e| Error::malformed(GLOBAL_ENV_KEY, e))?;
    let vars = doc.root().as_object_for(GLOBAL_ENV_KEY)?;

    for (name, value) in vars.iter() {
        let value = match value {
            ConfigValue::String(s) => s.to_string(),
            other => other.to_string(),
        };
        if export {
            std::env::set_var(name, &value);
        }
        env.set(name, value);
    }
    debug!(count = vars.len(), export, "applied global environment");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValue, MemoryStore, WatchStream};
    use crate::ErrorKind;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERFACES: &str = r#"{ "Publishers": [ { "Name": "default" } ] }"#;

    fn seeded(app: &str) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::from_entries([
            (format!("/{app}/interfaces"), INTERFACES.to_string()),
            (format!("/{app}/config"), "{}".to_string()),
        ]))
    }

    fn env(pairs: &[(&str, &str)]) -> Environment {
        Environment::from_pairs(pairs.iter().copied())
    }

    /// Store that counts every call, to prove bootstrap never reached it.
    #[derive(Debug, Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    impl KvStore for CountingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
        fn get_prefix(&self, _prefix: &str) -> Result<Vec<KeyValue>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
        fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn watch(&self, _key: &str) -> Result<Box<dyn WatchStream>, StoreError> {
            unreachable!("bootstrap never watches")
        }
        fn watch_prefix(&self, _prefix: &str) -> Result<Box<dyn WatchStream>, StoreError> {
            unreachable!("bootstrap never watches")
        }
    }

    #[test]
    fn test_missing_app_name_fails_before_store_access() {
        let store = Arc::new(CountingStore::default());
        let result = Context::builder()
            .with_environment(env(&[("DEV_MODE", "true")]))
            .with_store(store.clone())
            .build();

        assert!(matches!(result, Err(Error::MissingAppName)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blank_app_name_is_missing() {
        let result = Context::builder()
            .with_environment(env(&[("AppName", "  ")]))
            .with_store(seeded("App"))
            .build();
        assert!(matches!(result, Err(Error::MissingAppName)));
    }

    #[test]
    fn test_bootstrap_dev_defaults() {
        let ctx = Context::builder()
            .with_environment(env(&[("AppName", "App")]))
            .with_store(seeded("App"))
            .export_global_env(false)
            .build()
            .unwrap();

        assert_eq!(ctx.app_name(), "App");
        assert_eq!(ctx.mode(), Mode::Dev);
        assert_eq!(ctx.count(crate::Category::Publisher).unwrap(), 1);
    }

    #[test]
    fn test_missing_documents_are_fatal() {
        let store = Arc::new(MemoryStore::from_entries([("/App/config", "{}")]));
        let err = Context::builder()
            .with_environment(env(&[("AppName", "App")]))
            .with_store(store)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref k) if k == "/App/interfaces"));

        let store = Arc::new(MemoryStore::from_entries([("/App/interfaces", INTERFACES)]));
        let err = Context::builder()
            .with_environment(env(&[("AppName", "App")]))
            .with_store(store)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref k) if k == "/App/config"));
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let store = seeded("App");
        store.put("/App/config", "{ not json").unwrap();
        let err = Context::builder()
            .with_environment(env(&[("AppName", "App")]))
            .with_store(store)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_global_env_merges_into_snapshot() {
        let store = seeded("App");
        store
            .put(GLOBAL_ENV_KEY, r#"{ "PY_LOG_LEVEL": "DEBUG", "RETRIES": 3 }"#)
            .unwrap();

        let ctx = Context::builder()
            .with_environment(env(&[("AppName", "App")]))
            .with_store(store)
            .export_global_env(false)
            .build()
            .unwrap();

        assert_eq!(ctx.environment().get("PY_LOG_LEVEL"), Some("DEBUG"));
        assert_eq!(ctx.environment().get("RETRIES"), Some("3"));
    }

    #[test]
    #[serial]
    fn test_global_env_exported_to_process() {
        let store = seeded("App");
        store
            .put(GLOBAL_ENV_KEY, r#"{ "EDGECFG_GLOBAL_TEST": "on" }"#)
            .unwrap();

        Context::builder()
            .with_environment(env(&[("AppName", "App")]))
            .with_store(store)
            .build()
            .unwrap();

        assert_eq!(std::env::var("EDGECFG_GLOBAL_TEST").as_deref(), Ok("on"));
        std::env::remove_var("EDGECFG_GLOBAL_TEST");
    }

    #[test]
    fn test_registry_backend_selection() {
        let shared = seeded("App");
        let handle = shared.clone();
        let ctx = Context::builder()
            .with_environment(env(&[("AppName", "App"), ("KVStore", "etcd")]))
            .with_backend("etcd", move |_| Ok(handle.clone() as Arc<dyn KvStore>))
            .export_global_env(false)
            .build()
            .unwrap();
        assert_eq!(ctx.app_name(), "App");
    }

    #[test]
    fn test_unknown_backend_is_unsupported() {
        let err = Context::builder()
            .with_environment(env(&[("AppName", "App"), ("KVStore", "zookeeper")]))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_invalid_store_port_is_malformed() {
        let err = Context::builder()
            .with_environment(env(&[("AppName", "App"), ("ETCD_CLIENT_PORT", "not-a-port")]))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
