//! Runtime configuration, read from flags or `METAL_FACTORY_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Parser)]
#[command(name = "metal-factory", about = "Metal Factory shop backend", version)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "METAL_FACTORY_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Secret used to sign bearer tokens.
    #[arg(long, env = "METAL_FACTORY_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    /// Lifetime of issued tokens, in seconds.
    #[arg(long, env = "METAL_FACTORY_TOKEN_TTL_SECS", default_value_t = 3600)]
    pub token_ttl_secs: u64,

    /// Snapshot file loaded at startup and written on shutdown. Memory only when unset.
    #[arg(long, env = "METAL_FACTORY_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Origin allowed by CORS.
    #[arg(long, env = "METAL_FACTORY_CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,

    #[arg(long, env = "METAL_FACTORY_SEED_ADMIN_EMAIL", requires = "seed_admin_password")]
    pub seed_admin_email: Option<String>,

    #[arg(long, env = "METAL_FACTORY_SEED_ADMIN_PASSWORD", hide_env_values = true)]
    pub seed_admin_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("token secret must not be empty")]
    EmptySecret,
    #[error("token ttl must be greater than zero")]
    ZeroTtl,
    #[error("token ttl of {0} seconds is out of range (at most {max})", max = MAX_TOKEN_TTL_SECS)]
    TtlOutOfRange(u64),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        self.token_ttl()?;
        Ok(())
    }

    pub fn token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::TtlOutOfRange(self.token_ttl_secs));
        }
        i64::try_from(self.token_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or(ConfigError::TtlOutOfRange(self.token_ttl_secs))
    }

    /// Seed credentials, when both halves are configured.
    pub fn seed_admin(&self) -> Option<(&str, &str)> {
        match (&self.seed_admin_email, &self.seed_admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}
