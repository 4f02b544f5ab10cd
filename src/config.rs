//! Generation client configuration
//!
//! The API key is injected by the hosting environment. Model and endpoint
//! default to the public Gemini service and may be overridden from the
//! environment as well.

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::generation::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Environment variable overriding the model name
pub const MODEL_VAR: &str = "GEMINI_MODEL";
/// Environment variable overriding the service base URL
pub const ENDPOINT_VAR: &str = "GEMINI_ENDPOINT";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed validation
    #[error("invalid generation config: {0}")]
    Invalid(garde::Report),
}

/// Settings of the remote generation client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    /// Base URL of the service, without a trailing slash
    #[garde(custom(|v, _| http_url(v)))]
    pub endpoint: String,
    /// Model name used in the request path
    #[garde(length(min = 1))]
    pub model: String,
    /// Authentication key sent as the `key` query parameter
    #[garde(skip)]
    pub api_key: String,
}

fn http_url(value: &str) -> garde::Result {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(garde::Error::new("endpoint must be an http(s) URL"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: String::new(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// A missing key is left empty, as the hosting environment may inject it
    /// elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `Error::Invalid` if an override is not a usable value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns `Error::Invalid` if an override is not a usable value.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, Error> {
        let defaults = Self::default();
        let config = Self {
            endpoint: lookup(ENDPOINT_VAR)
                .map(|endpoint| endpoint.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.endpoint),
            model: lookup(MODEL_VAR).unwrap_or(defaults.model),
            api_key: lookup(API_KEY_VAR).unwrap_or_default(),
        };

        config.validate().map_err(Error::Invalid)?;

        Ok(config)
    }

    /// Sets the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Full `generateContent` URL for the configured model
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}
