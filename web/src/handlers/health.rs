//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness check.
///
/// Returns 200 OK if the service is running. Dependencies are not checked.
///
/// ```bash
/// curl http://localhost:8085/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Reservation storage answers queries
    pub database: bool,
    /// Session storage answers reads
    pub sessions: bool,
}

/// Readiness check.
///
/// Returns 200 OK when both the repository and the session store answer,
/// 503 otherwise.
///
/// ```bash
/// curl http://localhost:8085/ready
/// # {"ready":true,"database":true,"sessions":true}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match state.flow.ping().await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(error = %error, "Repository not ready");
            false
        }
    };
    let sessions = match state.sessions.ping().await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(error = %error, "Session store not ready");
            false
        }
    };

    let ready = database && sessions;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            database,
            sessions,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, Json(body)) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
