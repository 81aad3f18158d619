//! Store and client settings
//!
//! Settings are read from a TOML file. Every key is optional:
//!
//! ```toml
//! endpoint = "http://192.168.1.1/ubus"
//! session = "0123456789abcdef0123456789abcdef"
//! timeout_secs = 30
//! apply_timeout = 10
//! confirm_delay_ms = 1000
//! confirm_interval_ms = 250
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use ucistage_rpc::ANONYMOUS_SESSION;

/// Environment variable naming an explicit settings file
pub const SETTINGS_ENV: &str = "UCISTAGE_CONFIG";

/// Settings for the store and its RPC client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ubus JSON-RPC endpoint URL
    pub endpoint: Option<String>,

    /// Bridge command speaking line-delimited JSON-RPC on stdio, used
    /// instead of `endpoint` when set
    pub bridge: Vec<String>,

    /// Session token sent with every call
    pub session: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,

    /// Default rollback timeout for apply, in seconds
    pub apply_timeout: u64,

    /// Delay before the first confirm attempt, in milliseconds
    pub confirm_delay_ms: u64,

    /// Delay between confirm attempts, in milliseconds
    pub confirm_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            bridge: Vec::new(),
            session: ANONYMOUS_SESSION.to_string(),
            timeout_secs: 30,
            apply_timeout: 10,
            confirm_delay_ms: 1000,
            confirm_interval_ms: 250,
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load settings from `$UCISTAGE_CONFIG`, then the user config file,
    /// falling back to defaults when neither exists
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return Self::load_from(Path::new(&path));
        }

        match Self::user_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `~/.config/ucistage/config.toml`
    pub fn user_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".config/ucistage/config.toml"))
    }

    /// HTTP request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before the first confirm attempt
    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    /// Delay between confirm attempts
    pub fn confirm_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.session, ANONYMOUS_SESSION);
        assert_eq!(settings.apply_timeout, 10);
        assert_eq!(settings.confirm_delay(), Duration::from_secs(1));
        assert_eq!(settings.confirm_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "endpoint = \"http://10.0.0.1/ubus\"").unwrap();
        writeln!(file, "apply_timeout = 30").unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.endpoint.as_deref(), Some("http://10.0.0.1/ubus"));
        assert_eq!(settings.apply_timeout, 30);
        assert_eq!(settings.confirm_interval_ms, 250);
    }

    #[test]
    fn test_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "apply_timeout = \"soon\"").unwrap();

        assert!(Settings::load_from(file.path()).is_err());
    }
}
