//! Application configuration loaded from environment variables.
//!
//! Loading is fail-fast: a missing required variable or an unparsable value
//! stops the server with a message naming the variable.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Development-only signing secret for download URLs.
pub const INSECURE_STORAGE_SECRET: &str = "development-storage-signing-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Application environment mode.
///
/// Production refuses to start with insecure defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse `APP_ENV`. Unrecognized values mean development.
    pub fn from_env_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// First administrator, created at startup when absent.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    /// PEM-encoded RSA private key for session tokens.
    pub jwt_private_key: String,
    /// PEM-encoded RSA public key for session tokens.
    pub jwt_public_key: String,
    pub session_ttl_secs: i64,
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub app_env: AppEnvironment,
    /// Root of local object storage.
    pub storage_dir: PathBuf,
    /// Externally reachable base URL, used in signed download links.
    pub public_base_url: String,
    pub storage_signing_secret: String,
    pub signed_url_ttl_secs: i64,
    /// Interval of the orphaned artifact purge. Zero disables it.
    pub reconcile_interval_secs: u64,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&get, "PORT", 8080)?;

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingVar("BOOTSTRAP_ADMIN_PASSWORD".to_string()))
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingVar("BOOTSTRAP_ADMIN_EMAIL".to_string()))
            }
        };

        let config = Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            jwt_private_key: pem(required("JWT_PRIVATE_KEY")?),
            jwt_public_key: pem(required("JWT_PUBLIC_KEY")?),
            session_ttl_secs: parse_or(&get, "SESSION_TTL_SECS", 28_800)?,
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            host,
            port,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info,connect=debug".to_string()),
            app_env: get("APP_ENV")
                .map_or(AppEnvironment::Development, |v| AppEnvironment::from_env_str(&v)),
            storage_dir: get("STORAGE_DIR").map_or_else(|| PathBuf::from("./storage"), PathBuf::from),
            storage_signing_secret: get("STORAGE_SIGNING_SECRET")
                .unwrap_or_else(|| INSECURE_STORAGE_SECRET.to_string()),
            signed_url_ttl_secs: parse_or(&get, "SIGNED_URL_TTL_SECS", 900)?,
            reconcile_interval_secs: parse_or(&get, "RECONCILE_INTERVAL_SECS", 3600)?,
            cors_origins: get("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            bootstrap_admin,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs <= 0 {
            return Err(invalid("SESSION_TTL_SECS", "must be positive"));
        }
        if self.signed_url_ttl_secs <= 0 {
            return Err(invalid("SIGNED_URL_TTL_SECS", "must be positive"));
        }
        if self.db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "must be at least 1"));
        }
        if self.app_env.is_production() && self.storage_signing_secret == INSECURE_STORAGE_SECRET {
            return Err(invalid(
                "STORAGE_SIGNING_SECRET",
                "the development default is not allowed in production",
            ));
        }
        Ok(())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(var: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        message: message.to_string(),
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Keys passed through single-line env vars carry literal `\n`.
fn pem(raw: String) -> String {
    raw.replace("\\n", "\n")
}
