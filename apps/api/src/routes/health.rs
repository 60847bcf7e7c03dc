use axum::Json;
use serde_json::{json, Value};

/// GET /health
/// Liveness only; does not touch the models.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Resume Ranking API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
