//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /healthz`: process is up and serving.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: bazaar_core::version().to_string(),
    })
}
