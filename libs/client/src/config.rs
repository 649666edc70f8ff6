//! Client configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables with the `TREELIVES__` prefix (e.g. `TREELIVES__BASE_URL`).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::poll::{RefreshPolicy, View};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Server root, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory under `storage_dir` holding this application's session
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default = "default_poll_secs")]
    pub public_poll_secs: u64,

    #[serde(default = "default_poll_secs")]
    pub admin_poll_secs: u64,

    /// Unset: the own view refreshes on mount and on request only
    #[serde(default)]
    pub own_poll_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            namespace: default_namespace(),
            storage_dir: default_storage_dir(),
            public_poll_secs: default_poll_secs(),
            admin_poll_secs: default_poll_secs(),
            own_poll_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_namespace() -> String {
    "treelives".to_string()
}

fn default_storage_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_poll_secs() -> u64 {
    15
}

impl ClientConfig {
    /// Load configuration, optionally from a file.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let builder = config::Config::builder();

        let builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("treelives").required(false)),
        };

        let builder = builder.add_source(
            config::Environment::with_prefix("TREELIVES")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Poll periods must be non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("public_poll_secs", Some(self.public_poll_secs)),
            ("admin_poll_secs", Some(self.admin_poll_secs)),
            ("own_poll_secs", self.own_poll_secs),
        ];
        match periods.iter().find(|(_, secs)| *secs == Some(0)) {
            Some((name, _)) => Err(ConfigError::Parse(format!("{} must be at least 1", name))),
            None => Ok(()),
        }
    }

    /// Refresh cadence for `view`
    pub fn policy(&self, view: View) -> RefreshPolicy {
        match view {
            View::Public(_) => RefreshPolicy::Every(Duration::from_secs(self.public_poll_secs)),
            View::Admin => RefreshPolicy::Every(Duration::from_secs(self.admin_poll_secs)),
            View::Own => match self.own_poll_secs {
                Some(secs) => RefreshPolicy::Every(Duration::from_secs(secs)),
                None => RefreshPolicy::OnDemand,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = ClientConfig::load(None).unwrap();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.namespace, "treelives");
        assert_eq!(
            config.policy(View::Public(None)),
            RefreshPolicy::Every(Duration::from_secs(15))
        );
        assert_eq!(
            config.policy(View::Admin),
            RefreshPolicy::Every(Duration::from_secs(15))
        );
        assert_eq!(config.policy(View::Own), RefreshPolicy::OnDemand);
    }

    #[test]
    #[serial]
    fn test_file_then_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "base_url = \"http://alerts.example.org\"\npublic_poll_secs = 30\nown_poll_secs = 60"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        unsafe {
            std::env::set_var("TREELIVES__NAMESPACE", "field-app");
            std::env::set_var("TREELIVES__PUBLIC_POLL_SECS", "5");
        }

        let config = ClientConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_url, "http://alerts.example.org");
        assert_eq!(config.namespace, "field-app");
        assert_eq!(config.public_poll_secs, 5);
        assert_eq!(
            config.policy(View::Own),
            RefreshPolicy::Every(Duration::from_secs(60))
        );

        unsafe {
            std::env::remove_var("TREELIVES__NAMESPACE");
            std::env::remove_var("TREELIVES__PUBLIC_POLL_SECS");
        }
    }

    #[test]
    #[serial]
    fn test_zero_poll_period_is_rejected() {
        unsafe {
            std::env::set_var("TREELIVES__PUBLIC_POLL_SECS", "0");
        }
        let result = ClientConfig::load(None);
        unsafe {
            std::env::remove_var("TREELIVES__PUBLIC_POLL_SECS");
        }
        assert!(matches!(result, Err(ConfigError::Parse(msg)) if msg.contains("public_poll_secs")));

        let config = ClientConfig {
            own_poll_secs: Some(0),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Parse(_))));
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let result = ClientConfig::load(Some("/nonexistent/treelives-config"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
