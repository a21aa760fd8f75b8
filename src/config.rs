use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cricapi::DEFAULT_BASE_URL;
use crate::persist::CACHE_KEY;

/// Runtime settings, read from the environment after `.env` files are loaded.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub cache_key: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(6 * 60 * 60),
            cooldown: Duration::from_secs(30),
            cache_key: CACHE_KEY.to_string(),
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: opt_env("CRICAPI_KEY"),
            base_url: opt_env("CRICAPI_BASE_URL").unwrap_or(defaults.base_url),
            poll_interval: Duration::from_secs(
                env::var("POLL_SECS")
                    .ok()
                    .and_then(|val| val.trim().parse::<u64>().ok())
                    .unwrap_or(defaults.poll_interval.as_secs())
                    .max(10),
            ),
            cooldown: Duration::from_secs(
                env::var("POLL_COOLDOWN_SECS")
                    .ok()
                    .and_then(|val| val.trim().parse::<u64>().ok())
                    .unwrap_or(defaults.cooldown.as_secs())
                    .max(1),
            ),
            cache_key: opt_env("CACHE_KEY")
                .map(|key| sanitize_key(&key))
                .filter(|key| !key.is_empty())
                .unwrap_or(defaults.cache_key),
            cache_dir: opt_env("CRICSCANNER_CACHE_DIR").map(PathBuf::from),
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// Keys become file names, so keep them to a safe alphabet.
fn sanitize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_reduced_to_file_safe_chars() {
        assert_eq!(sanitize_key(" cricapi_matches "), "cricapi_matches");
        assert_eq!(sanitize_key("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_key("a b:c"), "abc");
    }

    #[test]
    fn defaults_poll_every_six_hours() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(21_600));
        assert_eq!(config.cache_key, "cricscanner_data");
        assert!(config.api_key.is_none());
    }
}
