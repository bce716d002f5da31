use std::fmt;

use crate::config::Resolved;
use crate::value::ConfigValue;
use crate::Error;

/// A resolved `EndPoint`, before it is interpreted for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSpec {
    /// String form: `"host:port"` for TCP, `"dir"` or `"dir,file"` for IPC.
    Text(String),
    /// Object form `{ "SocketDir": ..., "SocketFile": ... }`.
    Socket(SocketEndpoint),
}

/// IPC socket location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
    pub dir: String,
    pub file: Option<String>,
}

/// TCP `host:port` pair.
///
/// The port is kept as written; range checks are left to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpAddress {
    pub host: String,
    pub port: u32,
}

impl EndpointSpec {
    pub(crate) fn from_resolved(resolved: Resolved<'_>) -> Result<Self, Error> {
        match resolved {
            Resolved::Env { value, .. } => Ok(EndpointSpec::Text(value)),
            Resolved::Descriptor(ConfigValue::String(s)) => Ok(EndpointSpec::Text(s.to_string())),
            Resolved::Descriptor(ConfigValue::Object(obj)) => {
                let dir = obj.get_str("SocketDir")?.to_string();
                let file = match obj.get_opt("SocketFile") {
                    None | Some(ConfigValue::None) => None,
                    Some(v) => Some(v.as_str_for("SocketFile")?.to_string()),
                };
                Ok(EndpointSpec::Socket(SocketEndpoint { dir, file }))
            }
            Resolved::Descriptor(other) => Err(Error::malformed(
                "EndPoint",
                format!("expected string or object, found {}", other.kind()),
            )),
        }
    }

    /// Interprets the endpoint as `host:port`.
    pub fn tcp_address(&self) -> Result<TcpAddress, Error> {
        let EndpointSpec::Text(text) = self else {
            return Err(Error::malformed(
                "EndPoint",
                "expected \"host:port\" for a TCP transport, found a socket object",
            ));
        };

        let (host, port) = text
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| Error::malformed("EndPoint", format!("'{text}' is not host:port")))?;
        if host.is_empty() {
            return Err(Error::malformed("EndPoint", format!("'{text}' has no host")));
        }
        let port = port
            .parse()
            .map_err(|e| Error::malformed("EndPoint", format!("invalid port in '{text}': {e}")))?;

        Ok(TcpAddress {
            host: host.to_string(),
            port,
        })
    }

    /// Interprets the endpoint as an IPC socket location. The string form is
    /// `"dir"` or the legacy `"dir,file"`.
    pub fn socket(&self) -> Result<SocketEndpoint, Error> {
        let text = match self {
            EndpointSpec::Socket(socket) => return Ok(socket.clone()),
            EndpointSpec::Text(text) => text,
        };

        let (dir, file) = match text.split_once(',') {
            Some((dir, file)) => (dir.trim(), Some(file.trim())),
            None => (text.trim(), None),
        };
        if dir.is_empty() {
            return Err(Error::malformed(
                "EndPoint",
                format!("'{text}' has no socket directory"),
            ));
        }

        Ok(SocketEndpoint {
            dir: dir.to_string(),
            file: file.filter(|f| !f.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointSpec::Text(text) => f.write_str(text),
            EndpointSpec::Socket(SocketEndpoint { dir, file: None }) => f.write_str(dir),
            EndpointSpec::Socket(SocketEndpoint {
                dir,
                file: Some(file),
            }) => write!(f, "{dir},{file}"),
        }
    }
}
