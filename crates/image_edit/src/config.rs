use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const TIMEOUT_VAR: &str = "OPENAI_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the hosted image edits endpoint
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

// Keep the key out of logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`], with `api_key` (when given) taking
    /// precedence over `OPENAI_API_KEY`
    pub fn from_env_with_key(api_key: Option<&str>) -> Result<Self> {
        Self::from_lookup(with_key_override(api_key, |name| std::env::var(name).ok()))
    }

    /// Build from any variable source. The API key is required; the rest fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or(EditError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup(BASE_URL_VAR).filter(|url| !url.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                EditError::InvalidRequest(format!("{} must be a number of seconds, got '{}'", TIMEOUT_VAR, raw))
            })?;
        }
        Ok(config)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn with_key_override<'a>(
    api_key: Option<&'a str>,
    lookup: impl Fn(&str) -> Option<String> + 'a,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |name| match api_key {
        Some(key) if name == API_KEY_VAR => Some(key.to_string()),
        _ => lookup(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_key_is_set() {
        let config = ClientConfig::from_lookup(lookup(&[(API_KEY_VAR, "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_or_blank_key_is_an_error() {
        assert!(matches!(ClientConfig::from_lookup(lookup(&[])), Err(EditError::MissingApiKey)));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[(API_KEY_VAR, "  ")])),
            Err(EditError::MissingApiKey)
        ));
    }

    #[test]
    fn test_overrides_are_read() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "sk-test"),
            (BASE_URL_VAR, "http://localhost:8080/v1/"),
            (TIMEOUT_VAR, "5"),
        ]))
        .unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.endpoint("images/edits"), "http://localhost:8080/v1/images/edits");
    }

    #[test]
    fn test_key_override_keeps_other_variables() {
        let vars = lookup(&[
            (API_KEY_VAR, "sk-env"),
            (BASE_URL_VAR, "http://localhost:8080/v1"),
            (TIMEOUT_VAR, "7"),
        ]);
        let config = ClientConfig::from_lookup(with_key_override(Some("sk-flag"), vars)).unwrap();
        assert_eq!(config.api_key, "sk-flag");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout_secs, 7);

        let keyless = lookup(&[(BASE_URL_VAR, "http://localhost:9/v1")]);
        let config = ClientConfig::from_lookup(with_key_override(Some("sk-flag"), keyless)).unwrap();
        assert_eq!(config.api_key, "sk-flag");
        assert_eq!(config.base_url, "http://localhost:9/v1");

        let config = ClientConfig::from_lookup(with_key_override(None, lookup(&[(API_KEY_VAR, "sk-env")]))).unwrap();
        assert_eq!(config.api_key, "sk-env");
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let result = ClientConfig::from_lookup(lookup(&[(API_KEY_VAR, "k"), (TIMEOUT_VAR, "soon")]));
        assert!(matches!(result, Err(EditError::InvalidRequest(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", ClientConfig::new("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
    }
}
