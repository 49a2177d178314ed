//! Runtime configuration.
//!
//! Everything is read from the environment once at process start. Missing
//! values fall back to defaults; malformed values are a configuration error.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::error::{ClawfixError, Result};
use crate::services::diagnostics::cache::RESULT_CACHE_CAPACITY;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_API_BASE_URL: &str = "https://clawfix.dev";
pub const DEFAULT_ISSUE_TRACKER_URL: &str = "https://github.com/arcabotai/clawfix/issues";
pub const DEFAULT_AUGMENT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file backing the durable store. `None` runs cache-only.
    pub database_path: Option<PathBuf>,
    /// Anthropic API key. Absent means the augmenter always falls back.
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub augment_timeout: Duration,
    /// Public base URL, used for the feedback hook and the collector hint.
    pub api_base_url: String,
    pub issue_tracker_url: String,
    pub cache_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            anthropic_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            augment_timeout: Duration::from_secs(DEFAULT_AUGMENT_TIMEOUT_SECS),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            issue_tracker_url: DEFAULT_ISSUE_TRACKER_URL.to_string(),
            cache_capacity: RESULT_CACHE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("CLAWFIX_DB_PATH") {
            config.database_path = match path.as_str() {
                // Explicit opt-out of the durable backend
                "none" | ":none:" => None,
                _ => Some(PathBuf::from(path)),
            };
        }

        config.anthropic_api_key = get("ANTHROPIC_API_KEY");

        if let Some(model) = get("CLAWFIX_MODEL") {
            config.model = model;
        }

        if let Some(raw) = get("CLAWFIX_AUGMENT_TIMEOUT_SECS") {
            let secs = parse_positive("CLAWFIX_AUGMENT_TIMEOUT_SECS", &raw)?;
            config.augment_timeout = Duration::from_secs(secs as u64);
        }

        if let Some(url) = get("CLAWFIX_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(url) = get("CLAWFIX_ISSUE_TRACKER_URL") {
            config.issue_tracker_url = url;
        }

        if let Some(raw) = get("CLAWFIX_CACHE_CAPACITY") {
            config.cache_capacity = parse_positive("CLAWFIX_CACHE_CAPACITY", &raw)?;
        }

        Ok(config)
    }

    /// Collector one-liner shown to users whose request was rejected.
    pub fn collector_hint(&self) -> String {
        format!("Run the collector first: curl -sSL {}/fix | bash", self.api_base_url)
    }

    /// Endpoint the generated script reports success to.
    pub fn feedback_url(&self, fix_id: &str) -> String {
        format!("{}/api/feedback/{}", self.api_base_url, fix_id)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ClawfixError::config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

fn default_database_path() -> Option<PathBuf> {
    let proj_dirs = ProjectDirs::from("dev", "clawfix", "clawfix")?;
    Some(proj_dirs.data_dir().join("clawfix.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.augment_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLAWFIX_DB_PATH", "/tmp/clawfix-test.db"),
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("CLAWFIX_AUGMENT_TIMEOUT_SECS", "5"),
            ("CLAWFIX_API_BASE_URL", "http://localhost:3001/"),
            ("CLAWFIX_CACHE_CAPACITY", "10"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/tmp/clawfix-test.db"))
        );
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.augment_timeout, Duration::from_secs(5));
        assert_eq!(config.api_base_url, "http://localhost:3001");
        assert_eq!(
            config.feedback_url("abc"),
            "http://localhost:3001/api/feedback/abc"
        );
        assert_eq!(config.cache_capacity, 10);
    }

    #[test]
    fn test_blank_api_key_is_treated_as_absent() {
        let config = AppConfig::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "  ")])).unwrap();
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn test_db_path_opt_out() {
        let config = AppConfig::from_lookup(lookup(&[("CLAWFIX_DB_PATH", "none")])).unwrap();
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("CLAWFIX_CACHE_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, ClawfixError::Config(_)));

        let err =
            AppConfig::from_lookup(lookup(&[("CLAWFIX_AUGMENT_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ClawfixError::Config(_)));
    }
}
