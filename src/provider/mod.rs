// Upstream chat-completion collaborator
//
// The gate decides admission; everything after that goes through the
// `ChatProvider` trait so handlers never touch a concrete HTTP client.

pub mod openai;

use serde::{Deserialize, Serialize};

use crate::types::MessageBatch;

pub use openai::OpenAiProvider;

/// Assistant turn returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Errors that can occur while calling the upstream provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("upstream response was not understood: {0}")]
    InvalidResponse(String),
}

/// Implementations must be Send + Sync so they can be shared across request
/// handlers via `Arc`.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Only ever called with a batch the PII gate has admitted
    async fn complete(&self, batch: &MessageBatch) -> Result<ChatReply, ProviderError>;
}
