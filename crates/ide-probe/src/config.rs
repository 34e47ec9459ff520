//! Suite settings read from `TS_SELENIUM_*` environment variables.
//!
//! Settings are read once at start-up. The engine itself never looks at
//! the environment; it receives [`WaitConfig`]/[`AttemptConfig`] values
//! derived from here.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::logging::LogLevel;
use crate::wait::{AttemptConfig, WaitConfig, DEFAULT_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Base URL of the IDE under test
pub const ENV_BASE_URL: &str = "TS_SELENIUM_BASE_URL";
/// Run the browser without a window
pub const ENV_HEADLESS: &str = "TS_SELENIUM_HEADLESS";
/// Default wait timeout in milliseconds
pub const ENV_DEFAULT_TIMEOUT: &str = "TS_SELENIUM_DEFAULT_TIMEOUT";
/// Default polling interval in milliseconds
pub const ENV_DEFAULT_POLLING: &str = "TS_SELENIUM_DEFAULT_POLLING";
/// Default number of attempts
pub const ENV_DEFAULT_ATTEMPTS: &str = "TS_SELENIUM_DEFAULT_ATTEMPTS";
/// Page load timeout in milliseconds
pub const ENV_LOAD_PAGE_TIMEOUT: &str = "TS_SELENIUM_LOAD_PAGE_TIMEOUT";
/// Login user name
pub const ENV_USERNAME: &str = "TS_SELENIUM_USERNAME";
/// Login password
pub const ENV_PASSWORD: &str = "TS_SELENIUM_PASSWORD";
/// Log level (`INFO`, `DEBUG`, `TRACE`)
pub const ENV_LOG_LEVEL: &str = "TS_SELENIUM_LOG_LEVEL";

/// Default base URL
pub const DEFAULT_BASE_URL: &str = "http://sample-url";
/// Default page load timeout (2 minutes)
pub const DEFAULT_LOAD_PAGE_TIMEOUT_MS: u64 = 120_000;
/// Default user name
pub const DEFAULT_USERNAME: &str = "che";

/// Suite settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the IDE under test
    pub base_url: String,
    /// Headless browser
    pub headless: bool,
    /// Default wait timeout
    pub default_timeout: Duration,
    /// Default polling interval
    pub default_polling: Duration,
    /// Default attempts for attempt-bounded waits and recovery
    pub default_attempts: u32,
    /// Timeout for full page loads
    pub load_page_timeout: Duration,
    /// Login user name
    pub username: String,
    /// Login password; never serialized
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: false,
            default_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            default_polling: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            default_attempts: DEFAULT_ATTEMPTS,
            load_page_timeout: Duration::from_millis(DEFAULT_LOAD_PAGE_TIMEOUT_MS),
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            log_level: LogLevel::default(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("headless", &self.headless)
            .field("default_timeout", &self.default_timeout)
            .field("default_polling", &self.default_polling)
            .field("default_attempts", &self.default_attempts)
            .field("load_page_timeout", &self.load_page_timeout)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`.
    ///
    /// Missing values take their defaults, and so do numbers that are
    /// unparsable or zero.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            positive_number(&lookup, key).map_or(default, Duration::from_millis)
        };

        let log_level = match lookup(ENV_LOG_LEVEL) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "falling back to {}", LogLevel::default());
                LogLevel::default()
            }),
            None => defaults.log_level,
        };

        Self {
            base_url: non_empty(&lookup, ENV_BASE_URL).unwrap_or(defaults.base_url),
            headless: lookup(ENV_HEADLESS)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.headless),
            default_timeout: millis(ENV_DEFAULT_TIMEOUT, defaults.default_timeout),
            default_polling: millis(ENV_DEFAULT_POLLING, defaults.default_polling),
            default_attempts: positive_number(&lookup, ENV_DEFAULT_ATTEMPTS)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.default_attempts),
            load_page_timeout: millis(ENV_LOAD_PAGE_TIMEOUT, defaults.load_page_timeout),
            username: non_empty(&lookup, ENV_USERNAME).unwrap_or(defaults.username),
            password: lookup(ENV_PASSWORD).unwrap_or(defaults.password),
            log_level,
        }
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set default timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set default polling interval
    #[must_use]
    pub const fn with_default_polling(mut self, polling: Duration) -> Self {
        self.default_polling = polling;
        self
    }

    /// Set default attempts
    #[must_use]
    pub const fn with_default_attempts(mut self, attempts: u32) -> Self {
        self.default_attempts = attempts;
        self
    }

    /// Set page load timeout
    #[must_use]
    pub const fn with_load_page_timeout(mut self, timeout: Duration) -> Self {
        self.load_page_timeout = timeout;
        self
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set log level
    #[must_use]
    pub const fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Default wait config
    #[must_use]
    pub const fn wait_config(&self) -> WaitConfig {
        WaitConfig::new(self.default_timeout, self.default_polling)
    }

    /// Default attempt config
    #[must_use]
    pub const fn attempt_config(&self) -> AttemptConfig {
        AttemptConfig::new(self.default_attempts, self.default_polling)
    }

    /// Wait config for full page loads
    #[must_use]
    pub const fn page_load_config(&self) -> WaitConfig {
        WaitConfig::new(self.load_page_timeout, self.default_polling)
    }
}

fn non_empty<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn positive_number<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!(key, value = %raw, "ignoring invalid value, using default");
            None
        }
        Ok(n) => Some(n),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_empty_environment_gives_defaults() {
            let settings = Settings::from_lookup(lookup(&[]));
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.base_url, "http://sample-url");
            assert_eq!(settings.default_timeout, Duration::from_millis(20_000));
            assert_eq!(settings.default_polling, Duration::from_millis(1_000));
            assert_eq!(settings.default_attempts, 5);
            assert_eq!(settings.load_page_timeout, Duration::from_millis(120_000));
            assert_eq!(settings.username, "che");
            assert!(settings.password.is_empty());
            assert_eq!(settings.log_level, LogLevel::Info);
            assert!(!settings.headless);
        }

        #[test]
        fn test_derived_configs() {
            let settings = Settings::default();
            assert_eq!(settings.wait_config(), WaitConfig::default());
            assert_eq!(settings.attempt_config(), AttemptConfig::default());
            assert_eq!(settings.page_load_config().timeout, Duration::from_secs(120));
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_values_are_read() {
            let settings = Settings::from_lookup(lookup(&[
                (ENV_BASE_URL, "https://che.example.com"),
                (ENV_HEADLESS, "TRUE"),
                (ENV_DEFAULT_TIMEOUT, "3000"),
                (ENV_DEFAULT_POLLING, "250"),
                (ENV_DEFAULT_ATTEMPTS, "2"),
                (ENV_LOAD_PAGE_TIMEOUT, "60000"),
                (ENV_USERNAME, "admin"),
                (ENV_PASSWORD, "s3cret"),
                (ENV_LOG_LEVEL, "trace"),
            ]));
            assert_eq!(settings.base_url, "https://che.example.com");
            assert!(settings.headless);
            assert_eq!(settings.wait_config(), WaitConfig::new(Duration::from_secs(3), Duration::from_millis(250)));
            assert_eq!(settings.default_attempts, 2);
            assert_eq!(settings.load_page_timeout, Duration::from_secs(60));
            assert_eq!(settings.username, "admin");
            assert_eq!(settings.password, "s3cret");
            assert_eq!(settings.log_level, LogLevel::Trace);
        }

        #[test]
        fn test_invalid_numbers_fall_back() {
            let settings = Settings::from_lookup(lookup(&[
                (ENV_DEFAULT_TIMEOUT, "soon"),
                (ENV_DEFAULT_POLLING, "0"),
                (ENV_DEFAULT_ATTEMPTS, "-1"),
                (ENV_LOG_LEVEL, "loud"),
                (ENV_HEADLESS, "maybe"),
            ]));
            assert_eq!(settings, Settings::default());
        }

        #[test]
        fn test_blank_strings_fall_back() {
            let settings = Settings::from_lookup(lookup(&[(ENV_BASE_URL, "  "), (ENV_USERNAME, "")]));
            assert_eq!(settings.base_url, DEFAULT_BASE_URL);
            assert_eq!(settings.username, DEFAULT_USERNAME);
        }
    }

    mod secrecy_tests {
        use super::*;

        #[test]
        fn test_password_not_in_debug_or_json() {
            let settings = Settings::default().with_credentials("che", "hunter2");
            assert!(!format!("{settings:?}").contains("hunter2"));
            let json = serde_json::to_string(&settings).unwrap();
            assert!(!json.contains("hunter2"));
            let back: Settings = serde_json::from_str(&json).unwrap();
            assert!(back.password.is_empty());
            assert_eq!(back.username, "che");
        }
    }
}
