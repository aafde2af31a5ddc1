//! Health check handler

use axum::Json;
use serde::Serialize;

use crate::APP_NAME;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub version: &'static str,
}

/// GET /health - Liveness check, never behind auth
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
