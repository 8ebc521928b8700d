use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::pii::{GateError, MalformedReason};
use crate::types::MessageBatch;

/// Batch the PII gate admitted for this request, injected by [`pii_filter_middleware`]
#[derive(Clone, Debug)]
pub struct AdmittedBatch(MessageBatch);

impl AdmittedBatch {
    pub fn batch(&self) -> &MessageBatch {
        &self.0
    }
}

/// Middleware that screens the chat `messages` of a request body before the
/// handler (and therefore the upstream provider) sees them.
///
/// Rejections are returned directly; the inner handler only runs for an
/// admitted batch, and it receives the original body bytes untouched.
pub async fn pii_filter_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to read chat request body: {}", e);
            ApiError::from(GateError::MalformedInput(MalformedReason::UnreadableBody))
        })?;

    let batch = state.gate.screen_json(&bytes).map_err(|err| {
        // Sensitive rejections are logged by the gate itself
        if err.is_malformed() {
            tracing::info!("Rejected chat request: {}", err);
        }
        err
    })?;

    parts.extensions.insert(AdmittedBatch(batch));
    let request = Request::from_parts(parts, Body::from(bytes));

    Ok(next.run(request).await)
}
