use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Medbook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@medbook.local";

/// Get the application data directory
/// ~/Medbook/ on all platforms, or ./Medbook when no home directory is known
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default database file location
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("medbook.db")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "medbook_lib=debug,tower_http=debug,info"
    } else {
        "medbook_lib=info,warn"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Server settings, read from `MEDBOOK_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    /// Bootstrap token for the admin account. No admin is seeded when unset.
    pub admin_token: Option<String>,
    pub admin_email: String,
    /// Allowed browser origin. CORS stays off when unset.
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("MEDBOOK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "MEDBOOK_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        Ok(Self {
            bind_addr,
            db_path: get("MEDBOOK_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            admin_token: get("MEDBOOK_ADMIN_TOKEN"),
            admin_email: get("MEDBOOK_ADMIN_EMAIL")
                .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            cors_origin: get("MEDBOOK_CORS_ORIGIN"),
        })
    }
}
