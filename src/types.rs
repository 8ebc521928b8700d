/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            "system" => Some(ChatRole::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

/// One chat turn as submitted by a client.
///
/// Everything besides `role` and `content` is kept in `extra` as sent, so an
/// admitted batch serializes back to exactly what the client sent. That
/// includes the advisory `timestamp`, whatever its JSON type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }
}

/// Ordered chat turns submitted together in one request; order is conversation order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBatch(pub Vec<ChatMessage>);

impl MessageBatch {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ChatMessage>> for MessageBatch {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self(messages)
    }
}

/// Kinds of financial entry a user can record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Asset,
    Expense,
    Budget,
    Retirement,
    Tfsa,
    Stock,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Asset => "asset",
            EntryType::Expense => "expense",
            EntryType::Budget => "budget",
            EntryType::Retirement => "retirement",
            EntryType::Tfsa => "tfsa",
            EntryType::Stock => "stock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asset" => Some(EntryType::Asset),
            "expense" => Some(EntryType::Expense),
            "budget" => Some(EntryType::Budget),
            "retirement" => Some(EntryType::Retirement),
            "tfsa" => Some(EntryType::Tfsa),
            "stock" => Some(EntryType::Stock),
            _ => None,
        }
    }
}
