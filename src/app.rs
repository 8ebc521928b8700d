use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer};

use crate::config::{AppConfig, SecurityConfig};
use crate::crypto::FieldCipher;
use crate::database::{EntryStore, MemoryEntryStore, PgEntryStore};
use crate::handlers;
use crate::middleware::pii_filter_middleware;
use crate::pii::PiiGate;
use crate::provider::{ChatProvider, OpenAiProvider};
use crate::services::EntryService;

/// Shared state injected into axum handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<PiiGate>,
    pub provider: Option<Arc<dyn ChatProvider>>,
    pub entries: EntryService,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Wire collaborators from configuration. Connects to Postgres only when
    /// `DATABASE_URL` is set; otherwise entries live in memory.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let gate = PiiGate::standard(config.pii.limits())?;

        let provider: Option<Arc<dyn ChatProvider>> = match OpenAiProvider::from_config(&config.ai)? {
            Some(provider) => {
                tracing::info!(model = provider.model(), "AI provider configured");
                Some(Arc::new(provider))
            }
            None => {
                tracing::warn!("OpenAI API key not configured; /api/ai will answer 503");
                None
            }
        };

        let store: Arc<dyn EntryStore> = match &config.database.url {
            Some(url) => Arc::new(PgEntryStore::connect(url, &config.database).await?),
            None => {
                tracing::warn!("DATABASE_URL not set; financial entries are kept in memory");
                Arc::new(MemoryEntryStore::new())
            }
        };

        let cipher = config
            .security
            .encryption_key
            .as_deref()
            .map(FieldCipher::from_hex)
            .transpose()?;

        Ok(Self {
            gate: Arc::new(gate),
            provider,
            entries: EntryService::new(store, cipher),
            max_body_bytes: config.api.max_request_size_bytes,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    let router = Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/api/health", get(handlers::health::health))
        .merge(ai_routes(state.clone()))
        .merge(auth_routes())
        .merge(finance_routes())
        // Extractors get the same cap the PII middleware buffers with
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    with_security_headers(router)
}

/// Hardening headers on every response, errors included
fn with_security_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
}

fn ai_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Every chat request passes the PII gate before the handler runs
        .route(
            "/api/ai",
            post(handlers::ai::chat_post).route_layer(from_fn_with_state(state, pii_filter_middleware)),
        )
        .route("/api/ai/screen", post(handlers::ai::screen_post))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(handlers::auth::register_post))
        .route("/api/auth/login", post(handlers::auth::login_post))
}

fn finance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/finance", post(handlers::finance::entry_post))
        .route("/api/finance/:user_id", get(handlers::finance::entries_get))
}

/// CORS policy from configuration; `*` in the origin list allows any origin
pub fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::pii::GateLimits;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(max_body_bytes: usize) -> AppState {
        AppState {
            gate: Arc::new(PiiGate::standard(GateLimits::default()).unwrap()),
            provider: None,
            entries: EntryService::new(Arc::new(MemoryEntryStore::new()), None),
            max_body_bytes,
        }
    }

    fn post(path: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn assert_security_headers(response: &axum::response::Response) {
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert!(headers[header::STRICT_TRANSPORT_SECURITY]
            .to_str()
            .unwrap()
            .starts_with("max-age="));
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
    }

    #[tokio::test]
    async fn security_headers_on_success_and_error() {
        let app = build_router(state(1024 * 1024));

        let ok = app
            .clone()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        assert_security_headers(&ok);

        let blocked = app
            .oneshot(post(
                "/api/ai",
                r#"{"messages":[{"role":"user","content":"card 4111 1111 1111 1111"}]}"#.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(blocked.status(), StatusCode::BAD_REQUEST);
        assert_security_headers(&blocked);
    }

    #[tokio::test]
    async fn screen_route_shares_configured_body_limit() {
        // Above axum's 2 MB default but within the configured cap
        let max = 4 * 1024 * 1024;
        let padding = "a".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"messages":[{{"role":"user","content":"{}"}}]}}"#, padding);

        for path in ["/api/ai", "/api/ai/screen"] {
            let response = build_router(state(max)).oneshot(post(path, body.clone())).await.unwrap();
            // The gate ran and refused the oversized content as JSON
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json["code"], "INVALID_MESSAGES", "{path}");
        }
    }

    #[tokio::test]
    async fn screen_route_rejects_body_over_limit() {
        let padding = "a".repeat(4096);
        let body = format!(r#"{{"messages":[{{"role":"user","content":"{}"}}]}}"#, padding);
        let response = build_router(state(1024)).oneshot(post("/api/ai/screen", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn cors_can_be_disabled() {
        let mut security = AppConfig::development().security;
        assert!(cors_layer(&security).is_some());
        security.enable_cors = false;
        assert!(cors_layer(&security).is_none());
    }
}
