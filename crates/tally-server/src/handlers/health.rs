//! Health and API info handlers

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub api: &'static str,
}

/// GET / - API info
pub async fn root() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: "Tally API",
        version: env!("CARGO_PKG_VERSION"),
        api: "/api/v1",
    })
}

/// GET /health - Liveness check
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
