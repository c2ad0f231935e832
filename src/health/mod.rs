/*!
 * # Health Check Module
 *
 * `GET /health` reports whether the service can reach its database.
 */

use crate::{db, AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use utoipa::ToSchema;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthInfo {
    fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Basic health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and database are reachable", body = HealthInfo),
        (status = 503, description = "Database is unreachable", body = HealthInfo),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check endpoint called");

    let database =
        match tokio::time::timeout(DB_CHECK_TIMEOUT, db::check_connection(&state.db)).await {
            Ok(Ok(())) => HealthStatus::Up,
            Ok(Err(e)) => {
                error!("Database health check failed: {}", e);
                HealthStatus::Down
            }
            Err(_) => {
                error!("Database health check timed out after {:?}", DB_CHECK_TIMEOUT);
                HealthStatus::Down
            }
        };

    let info = HealthInfo {
        status: database,
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    (info.status_code(), Json(info))
}
