use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - Service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Finance tracker API",
        "endpoints": {
            "health": "GET /api/health",
            "ai": "POST /api/ai",
            "ai_screen": "POST /api/ai/screen",
            "auth": "POST /api/auth/register, POST /api/auth/login",
            "finance": "POST /api/finance, GET /api/finance/:user_id"
        }
    }))
}

/// GET /api/health - Liveness plus store reachability
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let store = state.entries.store();
    if let Err(e) = store.health_check().await {
        tracing::error!(backend = store.backend_name(), "Entry store health check failed: {}", e);
        return Err(ApiError::service_unavailable("Entry store unavailable"));
    }

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "store": store.backend_name(),
        "ai_configured": state.provider.is_some(),
        "encryption": state.entries.encrypts_at_rest(),
    })))
}
