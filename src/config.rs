/// Configuration management for the points ledger service
use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Symmetric secret used to sign session tokens
    pub jwt_secret: String,
    /// Session token lifetime
    pub token_ttl_hours: i64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> LedgerResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("POINTS_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("POINTS_PORT")
            .unwrap_or_else(|_| "50051".to_string())
            .parse()
            .map_err(|_| LedgerError::Validation("Invalid port number".to_string()))?;
        let version = env::var("POINTS_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("POINTS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("POINTS_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("points.sqlite"));
        let max_connections = env::var("POINTS_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("POINTS_JWT_SECRET")
            .map_err(|_| LedgerError::Validation("JWT secret required".to_string()))?;
        let token_ttl_hours = env::var("POINTS_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|_| LedgerError::Validation("Invalid token TTL".to_string()))?;

        let rate_limit_enabled = env::var("POINTS_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let requests_per_second = env::var("POINTS_RATE_LIMIT_REQUESTS_PER_SECOND")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let burst_size = env::var("POINTS_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_filter = env::var("RUST_LOG")
            .unwrap_or_else(|_| "points_ledger=debug,tower_http=debug".to_string());
        let log_json = env::var("POINTS_LOG_JSON")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                max_connections,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_hours,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                requests_per_second,
                burst_size,
            },
            logging: LoggingConfig {
                filter: log_filter,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> LedgerResult<()> {
        if self.service.hostname.is_empty() {
            return Err(LedgerError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(LedgerError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_hours <= 0 {
            return Err(LedgerError::Validation(
                "Token TTL must be at least one hour".to_string(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(LedgerError::Validation(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration for tests: in-memory database, rate limiting off
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 50051,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
                max_connections: 1,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only".to_string(),
                token_ttl_hours: 24,
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                requests_per_second: 100,
                burst_size: 50,
            },
            logging: LoggingConfig {
                filter: "points_ledger=debug".to_string(),
                json: false,
            },
        }
    }
}
