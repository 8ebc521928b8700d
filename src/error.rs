// HTTP API Error Types
use axum::{response::IntoResponse, http::StatusCode, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::StoreError;
use crate::pii::GateError;
use crate::provider::ProviderError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>
    },
    InvalidMessages(String),
    PiiDetected { category: &'static str },

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
    AiNotConfigured,
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidMessages(_) => 400,
            ApiError::PiiDetected { .. } => 400,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::AiNotConfigured => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidMessages(msg) => msg,
            ApiError::PiiDetected { .. } => "PII detected in message. Submission blocked.",
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
            ApiError::AiNotConfigured => "AI service not configured",
        }
    }

    /// Longer explanation for errors the chat clients show verbatim
    pub fn details(&self) -> Option<&'static str> {
        match self {
            ApiError::AiNotConfigured => Some(
                "To enable AI features, get an OpenAI API key from https://platform.openai.com/api-keys and set OPENAI_KEY in the server environment.",
            ),
            ApiError::BadGateway(_) => Some(
                "Sorry, the AI service is temporarily unavailable. Please try again in a moment.",
            ),
            _ => None,
        }
    }

    /// Hint shown to end users on how to proceed
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ApiError::PiiDetected { .. } => Some(
                "Remove personal details such as card, account or tax numbers and email addresses, then resend.",
            ),
            ApiError::AiNotConfigured => Some(
                "Set OPENAI_KEY to enable AI features. All other finance tracking features keep working.",
            ),
            ApiError::BadGateway(_) => Some(
                "The AI service is temporarily unavailable. You can continue using your finance dashboard.",
            ),
            _ => None,
        }
    }

    /// Convert to JSON response body.
    ///
    /// `error` carries the client-facing message itself; the web and mobile
    /// chat screens match on its text.
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "error": self.message(),
            "message": self.message(),
            "code": self.error_code()
        });

        match self {
            ApiError::ValidationError { field_errors: Some(field_errors), .. } => {
                response["field_errors"] = json!(field_errors);
            }
            ApiError::PiiDetected { category } => {
                response["category"] = json!(category);
            }
            _ => {}
        }

        if let Some(details) = self.details() {
            response["details"] = json!(details);
        }

        if let Some(suggestion) = self.suggestion() {
            response["suggestion"] = json!(suggestion);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidMessages(_) => "INVALID_MESSAGES",
            ApiError::PiiDetected { .. } => "PII_DETECTED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "AI_UPSTREAM_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::AiNotConfigured => "AI_NOT_CONFIGURED",
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors
        }
    }

    /// Single-field validation failure
    pub fn field_error(field: impl Into<String>, problem: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), problem.into());
        ApiError::validation_error("Invalid field format", Some(field_errors))
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::MalformedInput(reason) => {
                ApiError::InvalidMessages(format!("Invalid messages format: {}", reason))
            }
            GateError::SensitiveContentDetected { category, .. } => {
                ApiError::PiiDetected { category: category.label() }
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured => ApiError::AiNotConfigured,
            other => {
                // Upstream detail stays in the logs
                tracing::error!("AI provider error: {}", other);
                ApiError::bad_gateway("AI error")
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation { field, message } => ApiError::field_error(field, message),
            StoreError::Backend(msg) => {
                // Don't expose internal storage errors to clients
                tracing::error!("Entry store error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            StoreError::Crypto(err) => {
                tracing::error!("Entry encryption error: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pii::{MalformedReason, PiiCategory};

    #[test]
    fn gate_errors_map_to_distinct_codes() {
        let malformed: ApiError = GateError::MalformedInput(MalformedReason::MissingMessages).into();
        let sensitive: ApiError = GateError::SensitiveContentDetected {
            category: PiiCategory::TaxId,
            message_index: 0,
        }
        .into();

        assert_eq!(malformed.status_code(), 400);
        assert_eq!(sensitive.status_code(), 400);
        assert_eq!(malformed.error_code(), "INVALID_MESSAGES");
        assert_eq!(sensitive.error_code(), "PII_DETECTED");
    }

    #[test]
    fn pii_body_names_category_only() {
        let err: ApiError = GateError::SensitiveContentDetected {
            category: PiiCategory::EmailAddress,
            message_index: 3,
        }
        .into();
        let body = err.to_json();
        assert_eq!(body["category"], "email_address");
        assert_eq!(body["message"], "PII detected in message. Submission blocked.");
        assert!(body["suggestion"].is_string());
    }

    #[test]
    fn malformed_message_explains_shape() {
        let err: ApiError = GateError::MalformedInput(MalformedReason::NotASequence).into();
        assert_eq!(err.message(), "Invalid messages format: messages field is not an array");
    }

    #[test]
    fn provider_not_configured_is_503() {
        let err: ApiError = ProviderError::NotConfigured.into();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.error_code(), "AI_NOT_CONFIGURED");

        let body = err.to_json();
        assert_eq!(body["error"], "AI service not configured");
        assert!(body["details"].as_str().unwrap().contains("OPENAI_KEY"));
        assert!(body["suggestion"].is_string());
    }

    #[test]
    fn error_field_is_the_message_text() {
        let err: ApiError = GateError::SensitiveContentDetected {
            category: PiiCategory::PaymentCard,
            message_index: 0,
        }
        .into();
        let body = err.to_json();
        assert!(body["error"].as_str().unwrap().contains("PII detected"));
        assert!(body.get("details").is_none());

        let upstream: ApiError = ProviderError::UpstreamTimeout.into();
        let body = upstream.to_json();
        assert_eq!(body["error"], "AI error");
        assert!(body["details"].is_string());
    }
}
