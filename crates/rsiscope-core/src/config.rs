//! Process configuration: credentials and transport settings.
//!
//! Values are read once at startup. Each setting accepts an `RSISCOPE_`
//! prefixed variable, which wins over the bare name.
//!
//! | Setting | Variables | Default |
//! |---------|-----------|---------|
//! | OpenAI key | `RSISCOPE_OPENAI_API_KEY`, `OPENAI_API_KEY` | none |
//! | NewsAPI key | `RSISCOPE_NEWS_API_KEY`, `NEWS_API_KEY` | none |
//! | Chat model | `RSISCOPE_OPENAI_MODEL`, `OPENAI_MODEL` | `gpt-4` |
//! | Request timeout | `RSISCOPE_TIMEOUT_MS` | 10000 |

use std::fmt::{Debug, Formatter};

use thiserror::Error;

use crate::http_client::DEFAULT_TIMEOUT_MS;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing secret: set {name} (or RSISCOPE_{name})")]
    MissingSecret { name: &'static str },

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Credential whose value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub openai_api_key: Option<Secret>,
    pub news_api_key: Option<Secret>,
    pub openai_model: String,
    pub timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            news_api_key: None,
            openai_model: String::from(DEFAULT_OPENAI_MODEL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(&format!("RSISCOPE_{name}"))
                .or_else(|| lookup(name))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let timeout_ms = match lookup("RSISCOPE_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "RSISCOPE_TIMEOUT_MS",
                    value: raw,
                })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            openai_api_key: read("OPENAI_API_KEY").map(Secret::new),
            news_api_key: read("NEWS_API_KEY").map(Secret::new),
            openai_model: read("OPENAI_MODEL")
                .unwrap_or_else(|| String::from(DEFAULT_OPENAI_MODEL)),
            timeout_ms,
        })
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn openai_key(&self) -> Result<&Secret, ConfigError> {
        self.openai_api_key
            .as_ref()
            .ok_or(ConfigError::MissingSecret {
                name: "OPENAI_API_KEY",
            })
    }

    pub fn news_key(&self) -> Result<&Secret, ConfigError> {
        self.news_api_key.as_ref().ok_or(ConfigError::MissingSecret {
            name: "NEWS_API_KEY",
        })
    }
}
