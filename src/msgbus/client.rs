use serde_json::Value;

use super::keys::Keyring;
use super::{base_config, insert_entry, ipc_entry, required_str, tcp_entry, TransportType};
use crate::interface::Interface;
use crate::Error;

pub(super) fn build(iface: &Interface<'_>) -> Result<Value, Error> {
    let name = iface.name()?;
    let transport = iface.transport_type()?;
    let mut config = base_config(iface, transport)?;

    match transport {
        TransportType::ZmqIpc => {
            let socket = iface.endpoint()?.socket()?;
            config.insert("socket_dir".into(), socket.dir.clone().into());
            insert_entry(&mut config, name, ipc_entry(&socket))?;
        }
        TransportType::ZmqTcp => {
            let addr = iface.endpoint()?.tcp_address()?;
            let mut entry = tcp_entry(&addr);
            if !iface.context().is_dev_mode() {
                let server = required_str(iface, "ServerAppName")?;
                Keyring::new(iface.context())
                    .client_keys(server)?
                    .apply(&mut entry);
            }
            insert_entry(&mut config, name, entry)?;
        }
    }

    Ok(Value::Object(config))
}
