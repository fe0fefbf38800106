//! Loader settings. Read from env (`TABULAR_*`) by binaries; library callers may build them directly.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

/// Separators for composite text tokens: `1001=2|1002=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiters {
    /// Between list items, tuples and map entries.
    pub item: char,
    /// Between tuple positions and between a map key and its value.
    pub pair: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters { item: '|', pair: '=' }
    }
}

/// What `load_all` does when one config type fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing type; later types stay unloaded.
    #[default]
    AbortOnFirst,
    /// Load every type, then report all failures together.
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "abort_on_first" => Ok(FailurePolicy::AbortOnFirst),
            "continue" => Ok(FailurePolicy::Continue),
            _ => Err(ConfigError::Validation(format!(
                "invalid failure policy: {} (expected abort or continue)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Root directory for the filesystem reader.
    pub resource_dir: PathBuf,
    /// Manifest path, relative to `resource_dir` unless absolute.
    pub manifest: PathBuf,
    pub failure_policy: FailurePolicy,
    pub delimiters: Delimiters,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            resource_dir: PathBuf::from("res"),
            manifest: PathBuf::from("manifest.json"),
            failure_policy: FailurePolicy::default(),
            delimiters: Delimiters::default(),
        }
    }
}

impl Settings {
    /// From `TABULAR_RES_DIR`, `TABULAR_MANIFEST`, `TABULAR_FAIL_POLICY`,
    /// `TABULAR_ITEM_DELIM` and `TABULAR_PAIR_DELIM`; unset vars keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(dir) = lookup("TABULAR_RES_DIR") {
            settings.resource_dir = PathBuf::from(dir);
        }
        if let Some(manifest) = lookup("TABULAR_MANIFEST") {
            settings.manifest = PathBuf::from(manifest);
        }
        if let Some(policy) = lookup("TABULAR_FAIL_POLICY") {
            settings.failure_policy = policy.parse()?;
        }
        if let Some(item) = lookup("TABULAR_ITEM_DELIM") {
            settings.delimiters.item = single_char("TABULAR_ITEM_DELIM", &item)?;
        }
        if let Some(pair) = lookup("TABULAR_PAIR_DELIM") {
            settings.delimiters.pair = single_char("TABULAR_PAIR_DELIM", &pair)?;
        }
        if settings.delimiters.item == settings.delimiters.pair {
            return Err(ConfigError::Validation("item and pair delimiters must differ".into()));
        }
        Ok(settings)
    }

    pub fn manifest_path(&self) -> PathBuf {
        if self.manifest.is_absolute() {
            self.manifest.clone()
        } else {
            self.resource_dir.join(&self.manifest)
        }
    }
}

fn single_char(var: &str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != ',' && c != '"' => Ok(c),
        _ => Err(ConfigError::Validation(format!(
            "{} must be a single character other than ',' or '\"', got '{}'",
            var, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.manifest_path(), PathBuf::from("res/manifest.json"));
    }

    #[test]
    fn reads_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("TABULAR_RES_DIR", "/srv/config"),
            ("TABULAR_FAIL_POLICY", "continue"),
            ("TABULAR_ITEM_DELIM", ";"),
            ("TABULAR_PAIR_DELIM", ":"),
        ]))
        .unwrap();
        assert_eq!(s.resource_dir, PathBuf::from("/srv/config"));
        assert_eq!(s.failure_policy, FailurePolicy::Continue);
        assert_eq!(s.delimiters, Delimiters { item: ';', pair: ':' });
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::from_lookup(lookup(&[("TABULAR_FAIL_POLICY", "retry")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("TABULAR_ITEM_DELIM", "||")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("TABULAR_ITEM_DELIM", ",")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("TABULAR_PAIR_DELIM", "|")])).is_err());
    }
}
