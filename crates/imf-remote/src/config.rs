//! Remote server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Default API URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Project-local config file, relative to the working directory.
pub const LOCAL_CONFIG: &str = ".imf/config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Connection settings for the diagram API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            user_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    /// Load defaults, then the first config file found, then `IMF_*`
    /// environment overrides.
    ///
    /// An explicit path must exist; the fallback locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::candidates().into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded remote config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override fields from `IMF_API_URL`, `IMF_TOKEN`, `IMF_USER_ID` and
    /// `IMF_TIMEOUT_SECS` as returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("IMF_API_URL") {
            self.base_url = url;
        }
        if let Some(token) = lookup("IMF_TOKEN") {
            self.token = Some(token);
        }
        if let Some(user) = lookup("IMF_USER_ID") {
            self.user_id = Some(user);
        }
        if let Some(raw) = lookup("IMF_TIMEOUT_SECS") {
            self.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "IMF_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("imf").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RemoteConfig::from_toml("base_url = \"https://imf.example.org\"\n").unwrap();
        assert_eq!(config.base_url, "https://imf.example.org");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [("IMF_TOKEN", "secret"), ("IMF_TIMEOUT_SECS", " 3 ")]
            .into_iter()
            .collect();
        let mut config = RemoteConfig::from_toml("token = \"stale\"\nuser_id = \"u1\"").unwrap();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.user_id.as_deref(), Some("u1"));
        assert_eq!(config.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let mut config = RemoteConfig::default();
        let err = config
            .apply_env(|key| (key == "IMF_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "IMF_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = RemoteConfig::load(Some(Path::new("/nonexistent/imf/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
