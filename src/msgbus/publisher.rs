use serde_json::Value;

use super::keys::Keyring;
use super::{
    base_config, insert_entry, ipc_entry, is_wildcard, optional_str, tcp_entry, topic_keys,
    TransportType,
};
use crate::interface::Interface;
use crate::Error;

pub(super) fn build(iface: &Interface<'_>) -> Result<Value, Error> {
    let transport = iface.transport_type()?;
    let topics = iface.topics()?;
    let broker = optional_str(iface, "BrokerAppName")?;
    let prod = !iface.context().is_dev_mode();
    let mut config = base_config(iface, transport)?;

    match transport {
        TransportType::ZmqIpc => {
            let socket = iface.endpoint()?.socket()?;
            config.insert("socket_dir".into(), socket.dir.clone().into());

            // Without an explicit file the transport names one socket per
            // topic, which a wildcard cannot do.
            if socket.file.is_some() {
                for key in topic_keys(&topics) {
                    insert_entry(&mut config, &key, ipc_entry(&socket))?;
                }
            } else if is_wildcard(&topics) {
                return Err(Error::malformed(
                    "Topics",
                    "wildcard topic over IPC requires an explicit SocketFile",
                ));
            }

            if broker.is_some() {
                config.insert("brokered".into(), true.into());
            }
        }
        TransportType::ZmqTcp => {
            if topics.is_empty() {
                return Err(Error::malformed(
                    "Topics",
                    "a TCP publisher needs at least one topic",
                ));
            }
            let addr = iface.endpoint()?.tcp_address()?;
            let mut publish = tcp_entry(&addr);

            match broker {
                // Behind a broker this publisher connects to the broker's
                // X-SUB socket, so it pairs keys like a subscriber does.
                Some(broker) => {
                    publish.insert("brokered".into(), true.into());
                    if prod {
                        Keyring::new(iface.context())
                            .client_keys(broker)?
                            .apply(&mut publish);
                    }
                }
                None if prod => {
                    let keys =
                        Keyring::new(iface.context()).server_keys(&iface.allowed_clients()?)?;
                    keys.apply(&mut publish);
                    keys.apply_allowed_clients(&mut config);
                }
                None => {}
            }

            config.insert("zmq_tcp_publish".into(), Value::Object(publish));
        }
    }

    Ok(Value::Object(config))
}
