use axum::extract::{Json, Path, State};
use serde_json::Value;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{FinancialEntry, NewEntry};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /api/finance - Create a financial entry
pub async fn entry_post(State(state): State<AppState>, Json(payload): Json<Value>) -> ApiResult<FinancialEntry> {
    let entry = NewEntry::from_json(&payload)?;
    let created = state.entries.create(entry).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/finance/:user_id - List a user's entries, oldest first
pub async fn entries_get(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<FinancialEntry>> {
    let user = Uuid::parse_str(&user_id)
        .map_err(|_| ApiError::field_error("userId", format!("Invalid UUID format: {}", user_id)))?;

    let entries = state.entries.list_for_user(user).await?;
    Ok(ApiResponse::success(entries))
}
