//! Seed files for provisioning a store.
//!
//! A seed file is a JSON or TOML document whose top-level keys are store
//! keys. String values are stored verbatim; any other value is stored as its
//! JSON serialization, which is how interface and config documents end up in
//! the store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::StoreError;

/// Loads and parses a seed file, choosing the format from the extension
/// (`.toml` is TOML, anything else is JSON).
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub fn load_seed_file(
    path: impl AsRef<Path>,
    required: bool,
) -> Result<Option<BTreeMap<String, String>>, StoreError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let entries = if is_toml(path) {
                parse_toml(path, &contents)?
            } else {
                parse_json(path, &contents)?
            };
            Ok(Some(entries))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(StoreError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(StoreError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn parse_json(path: &Path, contents: &str) -> Result<BTreeMap<String, String>, StoreError> {
    let table: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(contents).map_err(|e| parse_error(path, e))?;

    Ok(table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

fn parse_toml(path: &Path, contents: &str) -> Result<BTreeMap<String, String>, StoreError> {
    let table: toml::Table = toml::from_str(contents).map_err(|e| parse_error(path, e))?;

    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                other => serde_json::to_string(&other).map_err(|e| parse_error(path, e))?,
            };
            Ok((key, value))
        })
        .collect()
}

fn parse_error(path: &Path, reason: impl std::fmt::Display) -> StoreError {
    StoreError::ParseError {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}
