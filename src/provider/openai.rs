use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ChatProvider, ChatReply, ProviderError};
use crate::config::AiConfig;
use crate::types::MessageBatch;

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    store: bool,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatReply,
}

/// OpenAI-compatible chat completions client
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    store: bool,
}

impl OpenAiProvider {
    /// Returns `Ok(None)` when no usable key is configured
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, ProviderError> {
        let Some(api_key) = config.api_key() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::UpstreamFailure(e.to_string()))?;

        Ok(Some(Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store: config.store,
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body<'a>(&'a self, batch: &'a MessageBatch) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            store: self.store,
            messages: batch
                .messages()
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, batch: &MessageBatch) -> Result<ChatReply, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(batch))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::UpstreamTimeout
                } else {
                    ProviderError::UpstreamFailure(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UpstreamStatus { status: status.as_u16() });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices returned".to_string()))
    }
}
