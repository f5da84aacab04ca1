use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::env;

/// Retention window for link records: 30 days.
pub const DEFAULT_RETENTION_SECONDS: i64 = 2_592_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub url: UrlConfig,
    pub sweep: SweepConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    pub short_code_length: usize,
    pub short_code_max_attempts: u32,
    pub retention_seconds: i64,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid SERVER_PORT".to_string()))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::MissingEnvVar("DATABASE_URL".to_string()))?;
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid DB_MAX_CONNECTIONS".to_string()))?;
        let db_min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid DB_MIN_CONNECTIONS".to_string()))?;
        let db_acquire_timeout = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                AppError::Configuration("Invalid DB_ACQUIRE_TIMEOUT_SECONDS".to_string())
            })?;

        let short_code_length = env::var("SHORT_CODE_LENGTH")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid SHORT_CODE_LENGTH".to_string()))?;
        let short_code_max_attempts = env::var("SHORT_CODE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid SHORT_CODE_MAX_ATTEMPTS".to_string()))?;
        let retention_seconds = env::var("RETENTION_SECONDS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_SECONDS.to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid RETENTION_SECONDS".to_string()))?;
        let base_url = env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

        let sweep_interval_seconds = env::var("SWEEP_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| AppError::Configuration("Invalid SWEEP_INTERVAL_SECONDS".to_string()))?;

        // CORS config
        let allowed_origins_str = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let allowed_origins: Vec<String> = if allowed_origins_str == "*" {
            vec!["*".to_string()]
        } else {
            allowed_origins_str
                .split(',')
                .map(|s| s.trim().to_string())
                .collect()
        };

        let config = Config {
            server: ServerConfig {
                host: server_host,
                port: server_port,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
                acquire_timeout_seconds: db_acquire_timeout,
            },
            url: UrlConfig {
                short_code_length,
                short_code_max_attempts,
                retention_seconds,
                base_url,
            },
            sweep: SweepConfig {
                interval_seconds: sweep_interval_seconds,
            },
            cors: CorsConfig { allowed_origins },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> AppResult<()> {
        // Validate database settings
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::Configuration(
                "DB_MIN_CONNECTIONS cannot be greater than DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if self.database.acquire_timeout_seconds == 0 {
            return Err(AppError::Configuration(
                "DB_ACQUIRE_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        // Validate URL settings
        if self.url.short_code_length < 4 || self.url.short_code_length > 16 {
            return Err(AppError::Configuration(
                "SHORT_CODE_LENGTH must be between 4 and 16".to_string(),
            ));
        }

        if self.url.short_code_max_attempts < 1 || self.url.short_code_max_attempts > 100 {
            return Err(AppError::Configuration(
                "SHORT_CODE_MAX_ATTEMPTS must be between 1 and 100".to_string(),
            ));
        }

        if self.url.retention_seconds < 1 {
            return Err(AppError::Configuration(
                "RETENTION_SECONDS must be at least 1".to_string(),
            ));
        }

        // Validate sweep settings
        if self.sweep.interval_seconds == 0 {
            return Err(AppError::Configuration(
                "SWEEP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
