use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{AutomationError, Result};

/// Environment variable holding the configuration as an inline JSON blob.
pub const CONFIG_ENV: &str = "PAGECRAFT_CONFIG";

/// Environment variable pointing at a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "PAGECRAFT_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub waits: WaitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
}

/// Wait budgets, in the units tests usually think in: whole seconds for
/// the outer budgets, milliseconds for the poll interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub page_load_secs: u64,
    pub element_load_secs: u64,
    pub http_request_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 720,
            user_agent: None,
            args: vec![],
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page_load_secs: 30,
            element_load_secs: 15,
            http_request_secs: 60,
            poll_interval_ms: 250,
        }
    }
}

impl WaitConfig {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn element_load(&self) -> Duration {
        Duration::from_secs(self.element_load_secs)
    }

    pub fn http_request(&self) -> Duration {
        Duration::from_secs(self.http_request_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from the environment: the inline JSON blob wins,
    /// then a configuration file, then the built-in defaults. All fields
    /// are optional in either JSON source.
    pub fn load() -> Result<Self> {
        if let Ok(blob) = std::env::var(CONFIG_ENV) {
            return serde_json::from_str(&blob).map_err(|e| {
                AutomationError::ConfigurationError(format!("invalid {}: {}", CONFIG_ENV, e))
            });
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let raw = std::fs::read_to_string(&path)?;
            return serde_json::from_str(&raw).map_err(|e| {
                AutomationError::ConfigurationError(format!("invalid config at {}: {}", path, e))
            });
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.browser.headless);
        assert_eq!(config.waits.page_load(), Duration::from_secs(30));
        assert_eq!(config.waits.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"browser": {"headless": false}}"#).expect("parse");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window_width, 1280);
        assert_eq!(config.waits.element_load_secs, 15);
    }

    #[test]
    fn wait_overrides() {
        let config: Config =
            serde_json::from_str(r#"{"waits": {"page_load_secs": 5, "poll_interval_ms": 50}}"#)
                .expect("parse");
        assert_eq!(config.waits.page_load(), Duration::from_secs(5));
        assert_eq!(config.waits.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.waits.http_request_secs, 60);
    }
}
