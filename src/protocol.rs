//! JSON messages exchanged with the backend.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::row::ResultRow;

/// Abstract query description produced by the backend for one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryParameters {
    pub fields: Vec<String>,
    #[serde(default)]
    pub filter: String,
    /// Absent, `null` and `[]` all mean "infer from the prompt".
    #[serde(default, rename = "selectionArgs", deserialize_with = "null_as_empty")]
    pub selection_args: Vec<String>,
    #[serde(default)]
    pub sort: String,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub service: String,
    pub parameters: QueryParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_prompt: String,
}
impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { kind: "prompt".into(), user_prompt: prompt.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub service: String,
    pub data: Vec<ResultRow>,
}
impl DataMessage {
    pub fn new(service: impl Into<String>, data: Vec<ResultRow>) -> Self {
        Self { kind: "data".into(), service: service.into(), data }
    }
}

/// Chat frame as it travels over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageData {
    pub message: String,
    #[serde(default, rename = "isSentByUser")]
    pub is_sent_by_user: bool,
    #[serde(default = "now_millis")]
    pub timestamp: i64,
}

/// Chat entry kept in the local history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub is_sent_by_user: bool,
    pub timestamp: i64,
}
impl ChatMessage {
    pub fn new(text: impl Into<String>, is_sent_by_user: bool) -> Self {
        Self { text: text.into(), is_sent_by_user, timestamp: now_millis() }
    }
}
impl From<ChatMessageData> for ChatMessage {
    fn from(data: ChatMessageData) -> Self {
        Self { text: data.message, is_sent_by_user: data.is_sent_by_user, timestamp: data.timestamp }
    }
}

pub const INVALID_MESSAGE_FORMAT: &str = "Error: Invalid message format";

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn decode_query(text: &str) -> Result<QueryEnvelope> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_chat(text: &str) -> Result<ChatMessageData> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode<T: Serialize>(message: &T) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}
