//! Connection settings for a `Client`.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, RpError};

pub const ENV_ENDPOINT: &str = "RP_ENDPOINT";
pub const ENV_PROJECT: &str = "RP_PROJECT";
pub const ENV_TOKEN: &str = "RP_TOKEN";
pub const ENV_API_VERSION: &str = "RP_API_VERSION";
pub const ENV_TIMEOUT_SECS: &str = "RP_TIMEOUT_SECS";

/// Settings used to construct a `Client`.
///
/// Deserializable so hosts can embed it in their own configuration files.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    pub project: String,
    pub token: String,
    #[serde(default = "default_api_version")]
    pub api_version: i32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_version() -> i32 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            project: project.into(),
            token: token.into(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Read settings from `RP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| RpError::Config(format!("{key} is not set")))
        };

        let mut config = Self::new(
            required(ENV_ENDPOINT)?,
            required(ENV_PROJECT)?,
            required(ENV_TOKEN)?,
        );
        if let Some(raw) = lookup(ENV_API_VERSION) {
            config.api_version = raw
                .parse()
                .map_err(|_| RpError::Config(format!("{ENV_API_VERSION}={raw} is not an integer")))?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw
                .parse()
                .map_err(|_| RpError::Config(format!("{ENV_TIMEOUT_SECS}={raw} is not an integer")))?;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "rp.example.com"),
            (ENV_PROJECT, "demo"),
            (ENV_TOKEN, "secret"),
        ]))
        .unwrap();
        assert_eq!(config, ClientConfig::new("rp.example.com", "demo", "secret"));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "rp.example.com"),
            (ENV_PROJECT, "demo"),
            (ENV_TOKEN, "secret"),
            (ENV_API_VERSION, "2"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_version, 2);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn from_lookup_rejects_missing_token() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "rp.example.com"),
            (ENV_PROJECT, "demo"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: RP_TOKEN is not set");
    }

    #[test]
    fn from_lookup_rejects_bad_version() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "rp.example.com"),
            (ENV_PROJECT, "demo"),
            (ENV_TOKEN, "secret"),
            (ENV_API_VERSION, "two"),
        ]))
        .unwrap_err();
        assert!(matches!(err, RpError::Config(_)));
    }

    #[test]
    fn debug_output_hides_token() {
        let config = ClientConfig::new("rp.example.com", "demo", "s3cr3t-token");
        let printed = format!("{config:?}");
        assert!(printed.contains("rp.example.com"), "{printed}");
        assert!(!printed.contains("s3cr3t-token"), "{printed}");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"endpoint":"https://rp.example.com","project":"demo","token":"t"}"#,
        )
        .unwrap();
        assert_eq!(config.api_version, 1);
        assert_eq!(config.timeout_secs, 30);
    }
}
