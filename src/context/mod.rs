//! Process identity, bootstrap and the in-memory interface model.

mod bootstrap;

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::config::Environment;
use crate::interface::{category_array, find_by_name, replace_topics, Category, Interface, InterfaceRef};
use crate::store::KvStore;
use crate::value::ConfigDocument;
use crate::watch::{self, WatchEvent, WatchHandle};
use crate::Error;

pub use bootstrap::ContextBuilder;

/// Whether the process runs with security material (`Prod`) or without it
/// (`Dev`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Prod,
}

impl Mode {
    /// Reads `DEV_MODE`; absent or empty means dev mode.
    pub fn from_env(env: &Environment) -> Result<Self, Error> {
        let dev = env
            .get_flag("DEV_MODE", true)
            .map_err(|v| Error::malformed("DEV_MODE", format!("expected true or false, found '{v}'")))?;
        Ok(if dev { Mode::Dev } else { Mode::Prod })
    }

    pub fn is_dev(self) -> bool {
        self == Mode::Dev
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Dev => f.write_str("dev"),
            Mode::Prod => f.write_str("prod"),
        }
    }
}

/// Everything the resolver knows about one application.
///
/// Built once at startup with [`Context::builder`]. Holds the app identity,
/// the environment snapshot used for overrides, the parsed `config` and
/// `interfaces` documents and the store client.
///
/// ## Example
///
/// ```no_run
/// use edgecfg::Context;
///
/// let ctx = Context::builder().build()?;
/// let publisher = ctx.interface(edgecfg::Category::Publisher, "default")?;
/// let msgbus = publisher.msgbus_config()?;
/// println!("{msgbus}");
/// # Ok::<(), edgecfg::Error>(())
/// ```
#[derive(Debug)]
pub struct Context {
    app_name: String,
    mode: Mode,
    env: Environment,
    app_config: ConfigDocument,
    interfaces: ConfigDocument,
    // Declared last so it is released after the documents.
    store: Arc<dyn KvStore>,
}

impl Context {
    /// Creates a new builder for bootstrapping a `Context`.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_dev_mode(&self) -> bool {
        self.mode.is_dev()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// The parsed `/<AppName>/config` document.
    pub fn app_config(&self) -> &ConfigDocument {
        &self.app_config
    }

    /// The in-memory `/<AppName>/interfaces` document, including local
    /// topic overrides.
    pub fn interfaces(&self) -> &ConfigDocument {
        &self.interfaces
    }

    /// Number of descriptors in a category. Fails if the category is missing
    /// or empty.
    pub fn count(&self, category: Category) -> Result<usize, Error> {
        Ok(category_array(&self.interfaces, category)?.len())
    }

    /// Looks up a descriptor by its `Name`.
    pub fn interface(&self, category: Category, name: &str) -> Result<Interface<'_>, Error> {
        let array = category_array(&self.interfaces, category)?;
        let (index, descriptor) =
            find_by_name(array, name).ok_or_else(|| Error::InterfaceNotFound {
                category,
                name: name.to_string(),
            })?;
        Ok(Interface::new(self, category, index, descriptor))
    }

    /// Looks up a descriptor by its position in the category array.
    pub fn interface_at(&self, category: Category, index: usize) -> Result<Interface<'_>, Error> {
        let array = category_array(&self.interfaces, category)?;
        let descriptor = array
            .get(index)?
            .as_object_for(category.array_key())?;
        Ok(Interface::new(self, category, index, descriptor))
    }

    pub fn resolve(&self, target: &InterfaceRef) -> Result<Interface<'_>, Error> {
        self.interface(target.category, &target.name)
    }

    pub fn publisher(&self, name: &str) -> Result<Interface<'_>, Error> {
        self.interface(Category::Publisher, name)
    }

    pub fn subscriber(&self, name: &str) -> Result<Interface<'_>, Error> {
        self.interface(Category::Subscriber, name)
    }

    pub fn server(&self, name: &str) -> Result<Interface<'_>, Error> {
        self.interface(Category::Server, name)
    }

    pub fn client(&self, name: &str) -> Result<Interface<'_>, Error> {
        self.interface(Category::Client, name)
    }

    /// Replaces the `Topics` of the targeted descriptor in the in-memory
    /// interfaces document.
    ///
    /// This is a local override: the store is not touched. Use
    /// [`persist_interfaces`](Self::persist_interfaces) to write it back.
    pub fn set_topics<S: AsRef<str>>(
        &mut self,
        target: &InterfaceRef,
        topics: &[S],
    ) -> Result<(), Error> {
        let topics: Vec<String> = topics.iter().map(|t| t.as_ref().to_string()).collect();
        replace_topics(&mut self.interfaces, target.category, &target.name, &topics)
    }

    /// Writes the in-memory interfaces document to `/<AppName>/interfaces`.
    pub fn persist_interfaces(&self) -> Result<(), Error> {
        let key = self.interfaces_key();
        self.store.put(&key, &self.interfaces.to_string())?;
        info!(key = %key, "persisted interfaces document");
        Ok(())
    }

    /// Watches a single store key, invoking `callback` on a background thread
    /// for every change.
    pub fn watch<F>(&self, key: &str, callback: F) -> Result<WatchHandle, Error>
    where
        F: FnMut(WatchEvent) + Send + 'static,
    {
        let stream = self.store.watch(key)?;
        watch::spawn(stream, key, callback)
    }

    /// Watches every store key under `prefix`.
    pub fn watch_prefix<F>(&self, prefix: &str, callback: F) -> Result<WatchHandle, Error>
    where
        F: FnMut(WatchEvent) + Send + 'static,
    {
        let stream = self.store.watch_prefix(prefix)?;
        watch::spawn(stream, prefix, callback)
    }

    /// Watches this application's `config` document.
    pub fn watch_config<F>(&self, callback: F) -> Result<WatchHandle, Error>
    where
        F: FnMut(WatchEvent) + Send + 'static,
    {
        self.watch(&self.config_key(), callback)
    }

    /// Watches this application's `interfaces` document.
    pub fn watch_interfaces<F>(&self, callback: F) -> Result<WatchHandle, Error>
    where
        F: FnMut(WatchEvent) + Send + 'static,
    {
        self.watch(&self.interfaces_key(), callback)
    }

    fn config_key(&self) -> String {
        format!("/{}/config", self.app_name)
    }

    fn interfaces_key(&self) -> String {
        format!("/{}/interfaces", self.app_name)
    }
}
