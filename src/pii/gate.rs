use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::{standard_patterns, PatternError, PatternSet, PiiCategory};
use crate::types::{ChatMessage, ChatRole, MessageBatch};

/// Size bounds applied before any pattern runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    pub max_messages: usize,
    pub max_content_bytes: usize,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            max_messages: 200,
            max_content_bytes: 32 * 1024,
        }
    }
}

/// Why a request body is not a usable message batch.
///
/// None of the variants carry message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    MissingMessages,
    NotASequence,
    EmptyBatch,
    TooManyMessages { count: usize, max: usize },
    NotAnObject { index: usize },
    MissingContent { index: usize },
    NonTextContent { index: usize },
    InvalidRole { index: usize },
    ContentTooLong { index: usize, max: usize },
    InvalidMessage { index: usize },
    InvalidJson,
    UnreadableBody,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingMessages => write!(f, "messages field missing"),
            MalformedReason::NotASequence => write!(f, "messages field is not an array"),
            MalformedReason::EmptyBatch => write!(f, "messages array is empty"),
            MalformedReason::TooManyMessages { count, max } => {
                write!(f, "{} messages exceeds the limit of {}", count, max)
            }
            MalformedReason::NotAnObject { index } => write!(f, "message {} is not an object", index),
            MalformedReason::MissingContent { index } => write!(f, "message {} has no content", index),
            MalformedReason::NonTextContent { index } => {
                write!(f, "message {} content is not text", index)
            }
            MalformedReason::InvalidRole { index } => {
                write!(f, "message {} role must be one of user, assistant, system", index)
            }
            MalformedReason::ContentTooLong { index, max } => {
                write!(f, "message {} content exceeds {} bytes", index, max)
            }
            MalformedReason::InvalidMessage { index } => write!(f, "message {} has invalid fields", index),
            MalformedReason::InvalidJson => write!(f, "request body is not valid JSON"),
            MalformedReason::UnreadableBody => write!(f, "request body could not be read"),
        }
    }
}

/// Terminal rejection of a message batch. Retrying the same input fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("malformed input: {0}")]
    MalformedInput(MalformedReason),

    #[error("sensitive content detected ({category}) in message {message_index}")]
    SensitiveContentDetected {
        category: PiiCategory,
        message_index: usize,
    },
}

impl GateError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, GateError::MalformedInput(_))
    }
}

impl From<MalformedReason> for GateError {
    fn from(reason: MalformedReason) -> Self {
        GateError::MalformedInput(reason)
    }
}

/// Admission control in front of the upstream chat provider.
///
/// Holds no per-request state; share one instance behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PiiGate {
    patterns: PatternSet,
    limits: GateLimits,
}

impl PiiGate {
    pub fn new(patterns: PatternSet, limits: GateLimits) -> Result<Self, PatternError> {
        // A gate without matchers would admit everything.
        if patterns.patterns().is_empty() {
            return Err(PatternError::EmptySet);
        }
        Ok(Self { patterns, limits })
    }

    /// Gate over the process-wide standard pattern set
    pub fn standard(limits: GateLimits) -> Result<Self, PatternError> {
        let patterns = match standard_patterns() {
            Ok(patterns) => patterns.clone(),
            Err(_) => PatternSet::standard()?,
        };
        Self::new(patterns, limits)
    }

    pub fn limits(&self) -> GateLimits {
        self.limits
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Validate the shape of a raw request body, then [`screen`](Self::screen) it.
    ///
    /// On success returns the batch exactly as received.
    pub fn screen_body(&self, body: &Value) -> Result<MessageBatch, GateError> {
        let batch = self.parse_body(body)?;
        self.screen(&batch)?;
        Ok(batch)
    }

    /// Same as [`screen_body`](Self::screen_body) for an undecoded JSON body.
    ///
    /// An empty body counts as a body without `messages`.
    pub fn screen_json(&self, bytes: &[u8]) -> Result<MessageBatch, GateError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(MalformedReason::MissingMessages.into());
        }
        let body: Value =
            serde_json::from_slice(bytes).map_err(|_| MalformedReason::InvalidJson)?;
        self.screen_body(&body)
    }

    /// Screen an already typed batch. Every admission decision ends here.
    pub fn screen(&self, batch: &MessageBatch) -> Result<(), GateError> {
        self.check_batch(batch)?;
        self.scan_batch(batch)
    }

    fn parse_body(&self, body: &Value) -> Result<MessageBatch, GateError> {
        let messages = body
            .as_object()
            .and_then(|object| object.get("messages"))
            .filter(|messages| !messages.is_null())
            .ok_or(MalformedReason::MissingMessages)?;

        let items = messages.as_array().ok_or(MalformedReason::NotASequence)?;
        self.check_count(items.len())?;

        let mut parsed = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let object = item.as_object().ok_or(MalformedReason::NotAnObject { index })?;

            let content = object
                .get("content")
                .filter(|content| !content.is_null())
                .ok_or(MalformedReason::MissingContent { index })?;
            let content = content.as_str().ok_or(MalformedReason::NonTextContent { index })?;
            self.check_content(index, content)?;

            object
                .get("role")
                .and_then(Value::as_str)
                .and_then(ChatRole::parse)
                .ok_or(MalformedReason::InvalidRole { index })?;

            let message: ChatMessage = serde_json::from_value(item.clone())
                .map_err(|_| MalformedReason::InvalidMessage { index })?;
            parsed.push(message);
        }

        Ok(MessageBatch::new(parsed))
    }

    fn check_batch(&self, batch: &MessageBatch) -> Result<(), GateError> {
        self.check_count(batch.len())?;
        for (index, message) in batch.messages().iter().enumerate() {
            self.check_content(index, &message.content)?;
        }
        Ok(())
    }

    fn check_count(&self, count: usize) -> Result<(), MalformedReason> {
        if count == 0 {
            return Err(MalformedReason::EmptyBatch);
        }
        if count > self.limits.max_messages {
            return Err(MalformedReason::TooManyMessages {
                count,
                max: self.limits.max_messages,
            });
        }
        Ok(())
    }

    // Oversized content is refused rather than truncated; an unscanned tail is never admitted.
    fn check_content(&self, index: usize, content: &str) -> Result<(), MalformedReason> {
        if content.len() > self.limits.max_content_bytes {
            return Err(MalformedReason::ContentTooLong {
                index,
                max: self.limits.max_content_bytes,
            });
        }
        Ok(())
    }

    fn scan_batch(&self, batch: &MessageBatch) -> Result<(), GateError> {
        for (message_index, message) in batch.messages().iter().enumerate() {
            if let Some(category) = self.patterns.scan(&message.content) {
                tracing::warn!(
                    category = category.label(),
                    message_index,
                    role = message.role.as_str(),
                    "chat submission blocked: sensitive content"
                );
                return Err(GateError::SensitiveContentDetected {
                    category,
                    message_index,
                });
            }
        }
        tracing::debug!(messages = batch.len(), "chat submission admitted");
        Ok(())
    }
}
