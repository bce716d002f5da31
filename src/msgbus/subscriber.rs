use serde_json::Value;

use super::keys::Keyring;
use super::{
    base_config, insert_entry, ipc_entry, optional_str, tcp_entry, topic_keys, TransportType,
};
use crate::interface::Interface;
use crate::Error;

/// `PublisherAppName` value meaning "subscribe through a broker".
const BROKER: &str = "*";

pub(super) fn build(iface: &Interface<'_>) -> Result<Value, Error> {
    let transport = iface.transport_type()?;
    let keys = topic_keys(&iface.topics()?);
    let prod = !iface.context().is_dev_mode();
    let mut config = base_config(iface, transport)?;

    match transport {
        TransportType::ZmqIpc => {
            let socket = iface.endpoint()?.socket()?;
            config.insert("socket_dir".into(), socket.dir.clone().into());
            for key in &keys {
                insert_entry(&mut config, key, ipc_entry(&socket))?;
            }
        }
        TransportType::ZmqTcp => {
            if keys.is_empty() {
                return Err(Error::malformed(
                    "Topics",
                    "a TCP subscriber needs at least one topic",
                ));
            }
            let addr = iface.endpoint()?.tcp_address()?;
            let publisher = optional_str(iface, "PublisherAppName")?;

            if !prod {
                for key in &keys {
                    insert_entry(&mut config, key, tcp_entry(&addr))?;
                }
                return Ok(Value::Object(config));
            }

            let keyring = Keyring::new(iface.context());
            match publisher {
                // Downstream of an X-SUB broker this side binds, so it is
                // secured like a publisher accepting every known client.
                Some(BROKER) => {
                    let server_keys = keyring.server_keys(&[BROKER.to_string()])?;
                    for key in &keys {
                        let mut entry = tcp_entry(&addr);
                        server_keys.apply(&mut entry);
                        insert_entry(&mut config, key, entry)?;
                    }
                    server_keys.apply_allowed_clients(&mut config);
                }
                Some(publisher) => {
                    let client_keys = keyring.client_keys(publisher)?;
                    for key in &keys {
                        let mut entry = tcp_entry(&addr);
                        client_keys.apply(&mut entry);
                        insert_entry(&mut config, key, entry)?;
                    }
                }
                None => {
                    return Err(Error::malformed(
                        "PublisherAppName",
                        "required for a TCP subscriber in prod mode",
                    ));
                }
            }
        }
    }

    Ok(Value::Object(config))
}
