use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}

/// GET /health
///
/// Reports process liveness only; store connectivity is not checked.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
