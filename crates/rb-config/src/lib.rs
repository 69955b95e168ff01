//! # rb-config
//!
//! Typed runtime settings. Sources are layered, later ones win:
//! built-in defaults, an optional `rusty-blog.toml`, then `BLOG_*` environment
//! variables (nested keys joined with `__`, e.g. `BLOG_SERVER__PORT=8080`).

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Minimum length accepted for a cookie signing/encryption key.
pub const MIN_SESSION_KEY_BYTES: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`
    pub static_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl DatabaseSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub bcrypt_cost: u32,
    /// When unset a random key is generated, which logs everybody out on restart.
    pub session_key: Option<SecretString>,
    pub cookie_secure: bool,
}

impl AuthSettings {
    pub fn session_key_bytes(&self) -> Option<&[u8]> {
        self.session_key.as_ref().map(|key| key.expose_secret().as_bytes())
    }
}

impl Settings {
    /// Loads `.env`, `rusty-blog.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                log::warn!("Ignoring unreadable .env file: {err}");
            }
        }

        let config = Self::defaults()?
            .add_source(File::with_name("rusty-blog").required(false))
            .add_source(
                Environment::with_prefix("BLOG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    /// Defaults overlaid with a TOML document. No file or environment access.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Self::finish(config)
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000_i64)?
            .set_default("server.static_dir", "./public")?
            .set_default("database.url", "sqlite:rusty_blog.db")?
            .set_default("database.max_attempts", 5_i64)?
            .set_default("database.initial_backoff_ms", 200_i64)?
            .set_default("database.max_backoff_ms", 5000_i64)?
            .set_default("auth.bcrypt_cost", 10_i64)?
            .set_default("auth.cookie_secure", false)?)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "auth.bcrypt_cost",
                reason: format!("{} is outside 4..=31", self.auth.bcrypt_cost),
            });
        }
        if let Some(key) = self.auth.session_key_bytes() {
            if key.len() < MIN_SESSION_KEY_BYTES {
                return Err(ConfigError::Invalid {
                    key: "auth.session_key",
                    reason: format!("needs at least {MIN_SESSION_KEY_BYTES} bytes, got {}", key.len()),
                });
            }
        }
        if self.database.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
