use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
pub enum ConfigError {
    #[error("unable to parse config: {0}")]
    Parse(String),

    #[error("unable to serialize config: {0}")]
    Serialize(String),
}

/// Host tunable settings, every field falls back to its default when missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default, rename_all = "camelCase")]
pub struct TapperConfig {
    /// Whether the host is already in the foreground when the session object is built
    pub start_in_foreground: bool,

    /// Write to blank tags that only offer the formattable technology
    pub format_blank_tags: bool,

    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for TapperConfig {
    fn default() -> Self {
        Self {
            start_in_foreground: true,
            format_blank_tags: true,
            log_filter: "info".to_string(),
        }
    }
}

impl TapperConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|error| ConfigError::Parse(error.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|error| ConfigError::Serialize(error.to_string()))
    }
}

#[uniffi::export]
fn tapper_config_from_json(json: String) -> Result<TapperConfig, ConfigError> {
    TapperConfig::from_json(&json)
}

#[uniffi::export]
fn tapper_config_to_json(config: TapperConfig) -> Result<String, ConfigError> {
    config.to_json()
}

#[uniffi::export]
fn tapper_config_default() -> TapperConfig {
    TapperConfig::default()
}
