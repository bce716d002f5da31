use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::config::Environment;

const DEFAULT_BACKEND: &str = "etcd";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 2379;
const SECRETS_DIR: &str = "/run/secrets";

/// Connection settings handed to a store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selector (`KVStore`).
    pub backend: String,
    pub dev_mode: bool,
    pub host: String,
    pub port: u16,
    /// Namespace applied to every key (`ETCD_PREFIX`); empty for none.
    #[serde(default)]
    pub prefix: String,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
}

impl StoreConfig {
    /// Builds the store settings for `app_name` from the environment.
    ///
    /// Certificate paths come from `CONFIGMGR_CERT`, `CONFIGMGR_KEY` and
    /// `CONFIGMGR_CACERT`. In prod mode, unset paths fall back to the
    /// conventional secrets locations; dev mode leaves them unset.
    ///
    /// Fails if `ETCD_CLIENT_PORT` is set but is not a valid port.
    pub fn from_env(app_name: &str, dev_mode: bool, env: &Environment) -> Result<Self, StoreError> {
        let backend = env
            .get_non_empty("KVStore")
            .unwrap_or(DEFAULT_BACKEND)
            .to_string();

        let path_var = |name: &str| env.get_non_empty(name).map(PathBuf::from);
        let secret = |file: String| (!dev_mode).then(|| PathBuf::from(SECRETS_DIR).join(file));

        let cert_file = path_var("CONFIGMGR_CERT")
            .or_else(|| secret(format!("{backend}_{app_name}_cert")));
        let key_file = path_var("CONFIGMGR_KEY")
            .or_else(|| secret(format!("{backend}_{app_name}_key")));
        let ca_file = path_var("CONFIGMGR_CACERT").or_else(|| secret(format!("ca_{backend}")));

        let port = match env.get_non_empty("ETCD_CLIENT_PORT") {
            Some(p) => p.trim().parse().map_err(|_| StoreError::InvalidSetting {
                name: "ETCD_CLIENT_PORT".to_string(),
                value: p.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: env
                .get_non_empty("ETCD_HOST")
                .unwrap_or(DEFAULT_HOST)
                .to_string(),
            port,
            prefix: env.get("ETCD_PREFIX").unwrap_or_default().trim().to_string(),
            backend,
            dev_mode,
            cert_file,
            key_file,
            ca_file,
        })
    }

    /// `host:port` of the store server.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
