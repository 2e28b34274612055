use std::str::FromStr;

// ============================================================================
// Configuration
// ============================================================================
//
// Read from the process environment after an optional `.env` file:
//
//   RESTBUCKS_HOST                bind address        (0.0.0.0)
//   RESTBUCKS_PORT                bind port           (8080)
//   DATABASE_URL                  PostgreSQL URL      (unset = in-memory)
//   RESTBUCKS_DB_MAX_CONNECTIONS  pool size           (5)
//   RESTBUCKS_DEFAULT_PAGE_SIZE   page size           (20)
//   RESTBUCKS_MAX_PAGE_SIZE       page size cap       (1000)
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub paging: PagingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            db_max_connections: 5,
            paging: PagingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            host: lookup("RESTBUCKS_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "RESTBUCKS_PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_var(
                &lookup,
                "RESTBUCKS_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            paging: PagingConfig {
                default_page_size: parse_var(
                    &lookup,
                    "RESTBUCKS_DEFAULT_PAGE_SIZE",
                    defaults.paging.default_page_size,
                )?,
                max_page_size: parse_var(
                    &lookup,
                    "RESTBUCKS_MAX_PAGE_SIZE",
                    defaults.paging.max_page_size,
                )?,
            },
        };

        for (name, value) in [
            ("RESTBUCKS_DB_MAX_CONNECTIONS", config.db_max_connections),
            ("RESTBUCKS_DEFAULT_PAGE_SIZE", config.paging.default_page_size),
            ("RESTBUCKS_MAX_PAGE_SIZE", config.paging.max_page_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
