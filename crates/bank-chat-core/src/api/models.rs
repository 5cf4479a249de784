use serde::{Deserialize, Serialize};

use crate::state::{ChatRole, Source};

/// Body of `POST /chat/`
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a str>,
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// Decoded answer from `POST /chat/`
///
/// Everything except `answer` is optional; older backends omit `method` and
/// `session_id`, and some send `sources: null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub escalate: Option<bool>,
}

/// Server-side transcript from `GET /chat/history/{session_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EndSessionResponse {
    #[serde(default)]
    pub message: Option<String>,
}
