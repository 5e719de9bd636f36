//! Service configuration, loaded once at startup

use crate::intake::IntakeConfig;
use crate::slug::SlugCheckPolicy;
use crate::supabase::SupabaseConfig;
use std::fmt::Display;
use std::fs::read_to_string;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read secret file {path}: {source}")]
    SecretFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("expected 'development' or 'production', got '{other}'")),
        }
    }
}

/// Where profiles and images live
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Supabase(SupabaseConfig),
    /// In-process store and object storage; nothing survives a restart
    Memory,
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Supabase(_) => "supabase",
            BackendConfig::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub admin_secret: Option<String>,
    pub backend: BackendConfig,
    pub max_upload_bytes: usize,
    pub intake: IntakeConfig,
}

impl AppConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate a config from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment: Environment = parse_or(&var, "APP_ENV", Environment::default())?;
        let bind_addr: SocketAddr = parse_or(&var, "BIND_ADDR", default_bind_addr())?;

        let admin_secret = match var("ADMIN_SECRET") {
            Some(secret) => Some(secret),
            None => var("ADMIN_SECRET_FILE")
                .map(|path| read_secret(PathBuf::from(path)))
                .transpose()?
                .filter(|secret| !secret.is_empty()),
        };

        let backend = match (var("SUPABASE_URL"), var("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(key)) => {
                let mut supabase = SupabaseConfig::new(url, key);
                if let Some(table) = var("PROFILES_TABLE") {
                    supabase.table = table;
                }
                if let Some(bucket) = var("PROFILE_IMAGES_BUCKET") {
                    supabase.bucket = bucket;
                }
                supabase.timeout =
                    Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 30u64)?);
                BackendConfig::Supabase(supabase)
            }
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
            (None, None) => BackendConfig::Memory,
        };

        let intake = IntakeConfig {
            slug_check_policy: parse_or(&var, "SLUG_CHECK_POLICY", SlugCheckPolicy::default())?,
            slug_insert_attempts: parse_or(&var, "SLUG_INSERT_ATTEMPTS", 3u32)?,
        };
        if intake.slug_insert_attempts == 0 {
            return Err(invalid("SLUG_INSERT_ATTEMPTS", "must be at least 1"));
        }

        let config = Self {
            environment,
            bind_addr,
            admin_secret,
            backend,
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            intake,
        };
        config.validate()?;
        Ok(config)
    }

    /// Production refuses to start without a real backend and an admin secret
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.environment {
            Environment::Production => {
                if self.admin_secret.is_none() {
                    return Err(ConfigError::Missing("ADMIN_SECRET"));
                }
                if matches!(self.backend, BackendConfig::Memory) {
                    return Err(ConfigError::Missing("SUPABASE_URL"));
                }
            }
            Environment::Development => {
                if self.admin_secret.is_none() {
                    warn!("ADMIN_SECRET not set, admin endpoints are open (development only)");
                }
                if matches!(self.backend, BackendConfig::Memory) {
                    warn!("Supabase not configured, using in-memory storage");
                }
            }
        }
        Ok(())
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn invalid(key: &'static str, message: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.to_string(),
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|e| invalid(key, e)),
        None => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}

fn read_secret(path: PathBuf) -> Result<String, ConfigError> {
    match read_to_string(&path) {
        Ok(contents) => Ok(contents.trim().to_string()),
        Err(source) => Err(ConfigError::SecretFile { path, source }),
    }
}
