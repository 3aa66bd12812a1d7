use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use maintly_core::AppError;
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Where the permission stores live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    /// Seeded in-process stores, lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub storage: StorageConfig,
    pub api_host: String,
    pub api_port: u16,
    pub resolution_cache_enabled: bool,
    pub frontend_url: String,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_source(env::args().nth(1).as_deref(), |name| env::var(name).ok())
    }

    fn from_source(
        command: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let migrate_only = command == Some("migrate");

        let storage = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_owned())
            .as_str()
        {
            "postgres" => {
                let database_url = lookup("DATABASE_URL")
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;
                let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                    Some(value) => parse_max_connections(value.as_str())?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                StorageConfig::Postgres {
                    database_url,
                    max_connections,
                }
            }
            "memory" => StorageConfig::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "STORAGE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        if migrate_only && storage == StorageConfig::Memory {
            return Err(AppError::Validation(
                "migrate requires STORAGE_BACKEND=postgres".to_owned(),
            ));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = match lookup("API_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))?,
            None => 3001,
        };

        // The cache is invalidated only by writes made through this process.
        // A shared database may be written by other instances, so PostgreSQL
        // deployments opt in explicitly.
        let resolution_cache_enabled = match lookup("RESOLUTION_CACHE_ENABLED") {
            Some(value) => parse_flag("RESOLUTION_CACHE_ENABLED", value.as_str())?,
            None => storage == StorageConfig::Memory,
        };

        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());

        Ok(Self {
            migrate_only,
            storage,
            api_host,
            api_port,
            resolution_cache_enabled,
            frontend_url,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_max_connections(value: &str) -> Result<u32, AppError> {
    let parsed = value.trim().parse::<u32>().map_err(|error| {
        AppError::Validation(format!("invalid DATABASE_MAX_CONNECTIONS: {error}"))
    })?;
    if parsed == 0 {
        return Err(AppError::Validation(
            "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
        ));
    }

    Ok(parsed)
}

fn parse_flag(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{value}'"
        ))),
    }
}
