//! Key material lookup.
//!
//! Keys are read from the store on every build and never cached:
//! public keys live at `/Publickeys/<AppName>`, an app's private key at
//! `/<AppName>/private_key`.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::is_wildcard;
use crate::store::KvStore;
use crate::{Context, Error};

pub const PUBLIC_KEYS_PREFIX: &str = "/Publickeys/";

/// Keys attached to the connecting side of a secure TCP link.
#[derive(Debug, Clone)]
pub(super) struct ClientKeys {
    server_public_key: Option<String>,
    client_public_key: String,
    client_secret_key: String,
}

impl ClientKeys {
    pub(super) fn apply(&self, entry: &mut Map<String, Value>) {
        if let Some(key) = &self.server_public_key {
            entry.insert("server_public_key".into(), key.clone().into());
        }
        entry.insert("client_public_key".into(), self.client_public_key.clone().into());
        entry.insert("client_secret_key".into(), self.client_secret_key.clone().into());
    }
}

/// Keys attached to the binding side of a secure TCP link.
#[derive(Debug, Clone)]
pub(super) struct ServerKeys {
    server_secret_key: String,
    allowed_clients: Vec<String>,
}

impl ServerKeys {
    pub(super) fn apply(&self, entry: &mut Map<String, Value>) {
        entry.insert("server_secret_key".into(), self.server_secret_key.clone().into());
    }

    pub(super) fn apply_allowed_clients(&self, config: &mut Map<String, Value>) {
        config.insert("allowed_clients".into(), self.allowed_clients.clone().into());
    }
}

pub(super) struct Keyring<'a> {
    store: &'a dyn KvStore,
    app_name: &'a str,
}

impl<'a> Keyring<'a> {
    pub(super) fn new(ctx: &'a Context) -> Self {
        Self {
            store: ctx.store().as_ref(),
            app_name: ctx.app_name(),
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.store.get(key)?.filter(|v| !v.trim().is_empty()))
    }

    pub(super) fn public_key(&self, app: &str) -> Result<Option<String>, Error> {
        self.read(&format!("{PUBLIC_KEYS_PREFIX}{app}"))
    }

    pub(super) fn own_public_key(&self) -> Result<String, Error> {
        self.public_key(self.app_name)?.ok_or_else(|| {
            Error::SecurityMaterialMissing(format!("public key of '{}'", self.app_name))
        })
    }

    pub(super) fn own_private_key(&self) -> Result<String, Error> {
        self.read(&format!("/{}/private_key", self.app_name))?
            .ok_or_else(|| {
                Error::SecurityMaterialMissing(format!("private key of '{}'", self.app_name))
            })
    }

    /// Every public key currently provisioned, ordered by app name.
    pub(super) fn all_public_keys(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .store
            .get_prefix(PUBLIC_KEYS_PREFIX)?
            .into_iter()
            .map(|kv| kv.value)
            .filter(|v| !v.trim().is_empty())
            .collect())
    }

    /// Resolves `AllowedClients` to public keys.
    ///
    /// `["*"]` expands to every provisioned key. Named clients without a key
    /// are skipped with a warning, but the result must not be empty.
    pub(super) fn allowed_client_keys(&self, clients: &[String]) -> Result<Vec<String>, Error> {
        let keys = if is_wildcard(clients) {
            self.all_public_keys()?
        } else {
            let mut keys = Vec::with_capacity(clients.len());
            for client in clients {
                match self.public_key(client)? {
                    Some(key) => keys.push(key),
                    None => warn!(client = %client, "no public key for allowed client, skipping"),
                }
            }
            keys
        };

        if keys.is_empty() {
            return Err(Error::SecurityMaterialMissing(format!(
                "no public keys resolved for allowed clients of '{}'",
                self.app_name
            )));
        }
        debug!(count = keys.len(), "resolved allowed client keys");
        Ok(keys)
    }

    pub(super) fn server_keys(&self, clients: &[String]) -> Result<ServerKeys, Error> {
        let allowed_clients = self.allowed_client_keys(clients)?;
        Ok(ServerKeys {
            server_secret_key: self.own_private_key()?,
            allowed_clients,
        })
    }

    /// Pairs this app's keys with the public key of `server_app`, which may
    /// be absent.
    pub(super) fn client_keys(&self, server_app: &str) -> Result<ClientKeys, Error> {
        let server_public_key = self.public_key(server_app)?;
        if server_public_key.is_none() {
            warn!(server = server_app, "no public key for server app");
        }
        Ok(ClientKeys {
            server_public_key,
            client_public_key: self.own_public_key()?,
            client_secret_key: self.own_private_key()?,
        })
    }
}
