/// Application context and dependency injection
use crate::{
    account::AccountStore,
    auth::TokenIssuer,
    config::ServerConfig,
    db,
    error::LedgerResult,
    ledger::{ActivityLedger, PointsService},
    rate_limit::RateLimiter,
};
use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountStore>,
    pub activities: Arc<ActivityLedger>,
    pub points: Arc<PointsService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> LedgerResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directory if it doesn't exist
        if config.storage.database.as_os_str() != ":memory:" {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        // Initialize database
        let pool = db::create_pool(
            &config.storage.database,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        // Run migrations
        db::run_migrations(&pool).await?;

        // Test connection
        db::test_connection(&pool).await?;

        Ok(Self::with_pool(config, pool))
    }

    /// Wire services around an already migrated pool
    pub fn with_pool(config: ServerConfig, pool: SqlitePool) -> Self {
        let accounts = Arc::new(AccountStore::new(pool.clone()));
        let activities = Arc::new(ActivityLedger::new(pool.clone()));

        let tokens = TokenIssuer::new(
            &config.authentication.jwt_secret,
            Duration::hours(config.authentication.token_ttl_hours),
        );
        let points = Arc::new(PointsService::new(
            Arc::clone(&accounts),
            Arc::clone(&activities),
            tokens,
        ));

        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            db: pool,
            accounts,
            activities,
            points,
            rate_limiter,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
