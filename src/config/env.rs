use std::collections::BTreeMap;

use tracing::debug;

/// A snapshot of environment variables.
///
/// Resolution reads overrides from this snapshot rather than from the process
/// environment, so every lookup within one [`Context`](crate::Context) sees the
/// same values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Captures the current process environment. Variables whose name or
    /// value is not valid unicode are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns the variable only if it is set to something other than
    /// whitespace.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// Splits a comma-separated variable into its trimmed, non-empty items.
    pub fn get_list(&self, name: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .get_non_empty(name)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!items.is_empty()).then_some(items)
    }

    /// Parses a boolean flag (`true`/`false`, case-insensitive).
    ///
    /// Absent or empty variables yield `default`. Any other value yields
    /// `Err` with the offending text.
    pub fn get_flag(&self, name: &str, default: bool) -> Result<bool, String> {
        match self.get_non_empty(name).map(str::trim) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(v) => Err(v.to_string()),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        debug!(name = %name, "setting environment variable");
        self.vars.insert(name, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
