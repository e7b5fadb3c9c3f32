//! EcrasPay client configuration
//!
//! Resolution order for every setting: explicit value > `ECRASPAY_*` env var >
//! legacy un-prefixed env var > package default.

use crate::payments::errors::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const SANDBOX_BASE_URL: &str = "https://sandbox.api.example.com";
pub const LIVE_BASE_URL: &str = "https://api.example.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Gateway environment, selected once at client construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Sandbox,
    Live,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_BASE_URL,
            Environment::Live => LIVE_BASE_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sandbox" => Ok(Environment::Sandbox),
            "live" => Ok(Environment::Live),
            other => Err(GatewayError::configuration(format!(
                "Invalid environment '{}'. Use 'sandbox' or 'live'.",
                other
            ))),
        }
    }
}

/// EcrasPay client configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// Secret API key sent as a bearer token
    pub api_key: String,
    pub environment: Environment,
    /// Webhook URL registered with the gateway for notifications
    pub webhook_url: Option<String>,
    /// Default redirect URL for hosted checkout
    pub redirect_url: Option<String>,
    /// Replaces the environment's base URL (proxies, local testing)
    pub base_url_override: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("webhook_url", &self.webhook_url)
            .field("redirect_url", &self.redirect_url)
            .field("base_url_override", &self.base_url_override)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            environment: Environment::Sandbox,
            webhook_url: None,
            redirect_url: None,
            base_url_override: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>, environment: Environment) -> Self {
        Self {
            api_key: api_key.into(),
            environment,
            ..Self::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let api_key = first_env(&["ECRASPAY_API_KEY", "API_KEY"]).ok_or_else(|| {
            GatewayError::configuration("ECRASPAY_API_KEY environment variable is required")
        })?;

        let environment = match first_env(&["ECRASPAY_ENVIRONMENT", "API_ENV"]) {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };

        let timeout = match first_env(&["ECRASPAY_TIMEOUT_SECS"]) {
            Some(value) => Duration::from_secs(value.parse().map_err(|_| {
                GatewayError::configuration(format!(
                    "ECRASPAY_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    value
                ))
            })?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            api_key,
            environment,
            webhook_url: first_env(&["ECRASPAY_WEBHOOK_URL", "WEBHOOK_URL"]),
            redirect_url: first_env(&["ECRASPAY_REDIRECT_URL", "ECRAS_REDIRECT_URL"]),
            base_url_override: first_env(&["ECRASPAY_BASE_URL"]),
            timeout,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_webhook_url(mut self, webhook_url: impl Into<String>) -> Self {
        self.webhook_url = Some(webhook_url.into());
        self
    }

    pub fn with_redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = Some(redirect_url.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url_override
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::configuration("API key is required"));
        }

        if self.timeout.is_zero() {
            return Err(GatewayError::configuration("Request timeout must be greater than 0"));
        }

        if let Some(base_url) = &self.base_url_override {
            if reqwest::Url::parse(base_url).is_err() {
                return Err(GatewayError::configuration(format!(
                    "Invalid base URL override '{}'",
                    base_url
                )));
            }
        }

        Ok(())
    }
}

// Empty values count as unset.
fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
