//! Resolves declarative interface descriptors stored in a key-value store
//! into message-bus transport configuration.

pub mod config;
pub mod context;
mod error;
pub mod interface;
pub mod msgbus;
pub mod store;
pub mod value;
pub mod watch;

pub use config::Environment;
pub use context::{Context, ContextBuilder, Mode};
pub use error::{Error, ErrorKind};
pub use interface::{Category, EndpointSpec, Interface, InterfaceRef};
pub use msgbus::TransportType;
pub use store::{KvStore, MemoryStore, StoreConfig};
pub use value::{ConfigDocument, ConfigValue};
pub use watch::{WatchEvent, WatchHandle, WatchValue};
