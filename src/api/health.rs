/// Health check endpoints for liveness and readiness probes
use crate::{context::AppContext, db};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessStatus {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    pub database: ComponentHealth,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<i64>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health/ready", get(readiness))
}

/// Readiness probe: the service can serve traffic once the database answers
async fn readiness(State(ctx): State<AppContext>) -> (StatusCode, Json<ReadinessStatus>) {
    let start = Instant::now();
    let check = db::test_connection(&ctx.db).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    let database = match check {
        Ok(()) => ComponentHealth {
            status: "healthy".to_string(),
            response_time_ms,
            error: None,
            accounts: ctx.accounts.count().await.ok(),
        },
        Err(e) => {
            tracing::error!("Readiness check failed: {}", e);
            ComponentHealth {
                status: "unhealthy".to_string(),
                response_time_ms,
                error: Some("database unavailable".to_string()),
                accounts: None,
            }
        }
    };

    let healthy = database.error.is_none();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessStatus {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            version: ctx.config.service.version.clone(),
            database,
        }),
    )
}
