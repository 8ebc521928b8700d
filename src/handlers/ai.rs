use axum::{
    body::Bytes,
    extract::{Extension, State},
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{AdmittedBatch, ApiResponse, ApiResult};
use crate::pii::GateError;
use crate::provider::ProviderError;

/// POST /api/ai - Forward an admitted chat batch to the AI provider
///
/// Only reachable through `pii_filter_middleware`; the `AdmittedBatch`
/// extension is missing (and the request fails) if the gate did not run.
///
/// Replies `{ "message": { role, content } }` without the success envelope;
/// the chat screens read `message.content` directly.
pub async fn chat_post(
    State(state): State<AppState>,
    Extension(admitted): Extension<AdmittedBatch>,
) -> Result<Json<Value>, ApiError> {
    let provider = state.provider.as_ref().ok_or(ProviderError::NotConfigured)?;

    let reply = provider.complete(admitted.batch()).await?;
    tracing::info!(messages = admitted.batch().len(), "AI chat completed");

    Ok(Json(json!({ "message": reply })))
}

#[derive(Debug, Serialize)]
pub struct ScreenResult {
    pub admitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
}

/// POST /api/ai/screen - Run the PII gate without calling the provider
///
/// Lets web and mobile clients warn before sending, using the same
/// patterns as `/api/ai`. Shape errors are still 400s.
pub async fn screen_post(State(state): State<AppState>, body: Bytes) -> ApiResult<ScreenResult> {
    match state.gate.screen_json(&body) {
        Ok(_) => Ok(ApiResponse::success(ScreenResult {
            admitted: true,
            category: None,
        })),
        Err(GateError::SensitiveContentDetected { category, .. }) => Ok(ApiResponse::success(ScreenResult {
            admitted: false,
            category: Some(category.label()),
        })),
        Err(err @ GateError::MalformedInput(_)) => Err(ApiError::from(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt; // for oneshot

    use crate::app::{build_router, AppState};
    use crate::database::MemoryEntryStore;
    use crate::pii::{GateLimits, PiiGate};
    use crate::provider::{ChatProvider, ChatReply, ProviderError};
    use crate::services::EntryService;
    use crate::types::MessageBatch;

    /// Records every batch it is asked to complete
    struct CapturingProvider {
        calls: AtomicUsize,
        last: tokio::sync::Mutex<Option<MessageBatch>>,
    }

    impl CapturingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last: tokio::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatProvider for CapturingProvider {
        async fn complete(&self, batch: &MessageBatch) -> Result<ChatReply, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().await = Some(batch.clone());
            Ok(ChatReply {
                role: "assistant".to_string(),
                content: Some("You spent $412 on groceries.".to_string()),
            })
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl ChatProvider for FailingProvider {
        async fn complete(&self, _batch: &MessageBatch) -> Result<ChatReply, ProviderError> {
            Err(ProviderError::UpstreamStatus { status: 500 })
        }
    }

    fn state_with(provider: Option<Arc<dyn ChatProvider>>) -> AppState {
        AppState {
            gate: Arc::new(PiiGate::standard(GateLimits::default()).unwrap()),
            provider,
            entries: EntryService::new(Arc::new(MemoryEntryStore::new()), None),
            max_body_bytes: 1024 * 1024,
        }
    }

    fn json_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn clean_batch_reaches_provider_unchanged() {
        let provider = Arc::new(CapturingProvider::new());
        let app = build_router(state_with(Some(provider.clone())));

        let body = r#"{"messages":[{"role":"user","content":"What did I spend on groceries?","timestamp":1712000000000}]}"#;
        let response = app.oneshot(json_request("/api/ai", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"]["role"], "assistant");
        assert_eq!(json["message"]["content"], "You spent $412 on groceries.");
        assert!(json.get("data").is_none());

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        let forwarded = provider.last.lock().await.clone().unwrap();
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(serde_json::to_value(&forwarded).unwrap(), sent["messages"]);
    }

    #[tokio::test]
    async fn card_number_is_blocked_before_provider() {
        let provider = Arc::new(CapturingProvider::new());
        let app = build_router(state_with(Some(provider.clone())));

        let body = r#"{"messages":[{"role":"user","content":"My card is 4111 1111 1111 1111, analyze my spending"}]}"#;
        let response = app.oneshot(json_request("/api/ai", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "PII_DETECTED");
        assert_eq!(json["category"], "payment_card");
        assert!(json["error"].as_str().unwrap().contains("PII detected"));
        assert!(!json.to_string().contains("4111"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_messages_is_malformed_not_pii() {
        let provider = Arc::new(CapturingProvider::new());
        let app = build_router(state_with(Some(provider.clone())));

        let response = app.oneshot(json_request("/api/ai", "{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_MESSAGES");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let app = build_router(state_with(Some(Arc::new(CapturingProvider::new()))));
        let response = app.oneshot(json_request("/api/ai", "{\"messages\": [")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_MESSAGES");
    }

    #[tokio::test]
    async fn same_sensitive_request_is_blocked_every_time() {
        let provider = Arc::new(CapturingProvider::new());
        let app = build_router(state_with(Some(provider.clone())));
        let body = r#"{"messages":[{"role":"user","content":"Email me at jane.doe@example.com with results"}]}"#;

        for _ in 0..3 {
            let response = app.clone().oneshot(json_request("/api/ai", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["code"], "PII_DETECTED");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gate_runs_before_provider_availability_check() {
        let app = build_router(state_with(None));

        let blocked = r#"{"messages":[{"role":"user","content":"account 1234567890"}]}"#;
        let response = app.clone().oneshot(json_request("/api/ai", blocked)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let clean = r#"{"messages":[{"role":"user","content":"How is my budget?"}]}"#;
        let response = app.oneshot(json_request("/api/ai", clean)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["code"], "AI_NOT_CONFIGURED");
        assert_eq!(json["error"], "AI service not configured");
        assert!(json["details"].is_string());
        assert!(json["suggestion"].is_string());
    }

    #[tokio::test]
    async fn upstream_failure_hides_upstream_status() {
        let app = build_router(state_with(Some(Arc::new(FailingProvider))));
        let clean = r#"{"messages":[{"role":"user","content":"How is my budget?"}]}"#;
        let response = app.oneshot(json_request("/api/ai", clean)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "AI error");
        assert!(json["details"].is_string());
        assert!(!json.to_string().contains("500"));
    }

    #[tokio::test]
    async fn screen_reports_category_without_calling_provider() {
        let provider = Arc::new(CapturingProvider::new());
        let app = build_router(state_with(Some(provider.clone())));

        let body = r#"{"messages":[{"role":"user","content":"my SIN is AB123456"}]}"#;
        let response = app.clone().oneshot(json_request("/api/ai/screen", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["admitted"], false);
        assert_eq!(json["data"]["category"], "tax_id");

        let clean = r#"{"messages":[{"role":"user","content":"Show my TFSA room"}]}"#;
        let response = app.clone().oneshot(json_request("/api/ai/screen", clean)).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["admitted"], true);
        assert!(json["data"].get("category").is_none());

        let response = app.oneshot(json_request("/api/ai/screen", r#"{"messages":"hi"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
