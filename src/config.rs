use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub card: CardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardConfig {
    /// Gateway RSA public key (file path or key text) for server-side card encryption
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Flat environment variables mapped onto nested keys
const ENV_KEYS: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("ENVIRONMENT", "server.environment"),
    ("DATABASE_URL", "database.url"),
    ("DATABASE_MAX_CONNECTIONS", "database.max_connections"),
    ("ECRASPAY_CARD_PUBLIC_KEY", "card.public_key"),
];

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(|name| env::var(name).ok())
    }

    /// Build from defaults overlaid with whatever `lookup` returns for each
    /// variable in [`ENV_KEYS`].
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.environment", "development")?
            .set_default("database.max_connections", 20)?;

        for &(var, key) in ENV_KEYS {
            builder = builder
                .set_override_option(key, lookup(var).filter(|v| !v.trim().is_empty()))
                .with_context(|| format!("invalid value for {}", var))?;
        }

        let config: Config = builder
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("DATABASE_URL not set or a setting has the wrong type")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        Ok(())
    }
}
