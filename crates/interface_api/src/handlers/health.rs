//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use core_kernel::AdapterHealth;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: None,
        latency_ms: None,
    })
}

/// Readiness check (includes database)
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let result = state.readiness.health_check().await;
    let (status, label) = match result.status {
        AdapterHealth::Healthy => (StatusCode::OK, "ready"),
        AdapterHealth::Degraded => (StatusCode::OK, "degraded"),
        AdapterHealth::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            message: result.message,
            latency_ms: Some(result.latency_ms),
        }),
    )
}
