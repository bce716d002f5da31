//! Message-bus transport configuration.
//!
//! Turns one interface descriptor, the context's mode and its environment
//! overrides into the JSON object consumed by the message-bus runtime. A
//! build either returns the complete object or fails; nothing partial is
//! ever handed out.

mod client;
mod keys;
mod publisher;
mod server;
mod subscriber;

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::interface::{Category, Interface, SocketEndpoint, TcpAddress};
use crate::value::ConfigValue;
use crate::Error;

pub use keys::PUBLIC_KEYS_PREFIX;

/// Keys the builder writes at the top level of a config object. Topic and
/// interface names must not shadow them.
const RESERVED_KEYS: &[&str] = &[
    "type",
    "socket_dir",
    "zmq_recv_hwm",
    "zmq_tcp_publish",
    "allowed_clients",
    "brokered",
];

/// The transports a descriptor may select with `Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    ZmqTcp,
    ZmqIpc,
}

impl TransportType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportType::ZmqTcp => "zmq_tcp",
            TransportType::ZmqIpc => "zmq_ipc",
        }
    }
}

impl FromStr for TransportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zmq_tcp" => Ok(TransportType::ZmqTcp),
            "zmq_ipc" => Ok(TransportType::ZmqIpc),
            other => Err(Error::Unsupported(format!("transport type '{other}'"))),
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn build(iface: &Interface<'_>) -> Result<Value, Error> {
    let category = iface.category();
    let result = match category {
        Category::Publisher => publisher::build(iface),
        Category::Subscriber => subscriber::build(iface),
        Category::Server => server::build(iface),
        Category::Client => client::build(iface),
    };

    let name = iface.name().unwrap_or("<unnamed>");
    match &result {
        Ok(_) => debug!(%category, name, "built message bus config"),
        Err(e) => error!(%category, name, error = %e, "failed to build message bus config"),
    }
    result
}

/// Starts a config object with its `type` and optional `zmq_recv_hwm`.
fn base_config(iface: &Interface<'_>, transport: TransportType) -> Result<Map<String, Value>, Error> {
    let mut config = Map::new();
    config.insert("type".into(), transport.as_str().into());

    match iface.descriptor().get_opt("zmq_recv_hwm") {
        None | Some(ConfigValue::None) => {}
        Some(value) => {
            let hwm = value.as_i64_for("zmq_recv_hwm")?;
            config.insert("zmq_recv_hwm".into(), hwm.into());
        }
    }
    Ok(config)
}

/// Reads an optional string field; present-but-not-a-string is an error.
fn optional_str<'a>(iface: &Interface<'a>, key: &str) -> Result<Option<&'a str>, Error> {
    match iface.descriptor().get_opt(key) {
        None | Some(ConfigValue::None) => Ok(None),
        Some(value) => Ok(Some(value.as_str_for(key)?)),
    }
}

fn required_str<'a>(iface: &Interface<'a>, key: &str) -> Result<&'a str, Error> {
    optional_str(iface, key)?
        .ok_or_else(|| Error::malformed(key, "required field is missing"))
}

fn is_wildcard<S: AsRef<str>>(items: &[S]) -> bool {
    items.len() == 1 && items[0].as_ref() == "*"
}

/// Keys of the per-topic entries; `["*"]` collapses to the empty string.
fn topic_keys(topics: &[&str]) -> Vec<String> {
    if is_wildcard(topics) {
        vec![String::new()]
    } else {
        topics.iter().map(|t| (*t).to_string()).collect()
    }
}

fn tcp_entry(addr: &TcpAddress) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("host".into(), addr.host.clone().into());
    entry.insert("port".into(), addr.port.into());
    entry
}

fn ipc_entry(socket: &SocketEndpoint) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("socket_dir".into(), socket.dir.clone().into());
    if let Some(file) = &socket.file {
        entry.insert("socket_file".into(), file.clone().into());
    }
    entry
}

/// Inserts a per-topic or per-name entry, refusing to shadow builder keys.
fn insert_entry(
    config: &mut Map<String, Value>,
    key: &str,
    entry: Map<String, Value>,
) -> Result<(), Error> {
    if RESERVED_KEYS.contains(&key) {
        return Err(Error::malformed(
            "interface",
            format!("'{key}' is reserved and cannot name a topic or interface"),
        ));
    }
    config.insert(key.to_string(), Value::Object(entry));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_transport_type_parsing() {
        assert_eq!("zmq_tcp".parse::<TransportType>().unwrap(), TransportType::ZmqTcp);
        assert_eq!("zmq_ipc".parse::<TransportType>().unwrap(), TransportType::ZmqIpc);

        for other in ["tcp", "ZMQ_TCP", "zmq_udp", " zmq_tcp ", "zmq_ipc\n", ""] {
            let err = other.parse::<TransportType>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported, "{other}");
        }
    }

    #[test]
    fn test_topic_keys() {
        assert_eq!(topic_keys(&["*"]), vec![""]);
        assert_eq!(topic_keys(&["a", "*"]), vec!["a", "*"]);
        assert_eq!(topic_keys(&[]), Vec::<String>::new());
    }

    #[test]
    fn test_reserved_keys_rejected() {
        let mut config = Map::new();
        let err = insert_entry(&mut config, "type", Map::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(config.is_empty());
    }
}
