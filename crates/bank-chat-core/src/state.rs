//! UI-agnostic conversation data types
//!
//! These are shared by every front-end (the TUI and the one-shot CLI) and don't
//! depend on any specific UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text shown in place of an answer when the backend call fails.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// A message in the support conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub escalate: bool,
    #[serde(default)]
    pub error: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: ChatRole::User,
            content: content.into(),
            sources: Vec::new(),
            method: None,
            escalate: false,
            error: false,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(
        id: u64,
        content: impl Into<String>,
        sources: Vec<Source>,
        method: Option<String>,
        escalate: bool,
    ) -> Self {
        Self {
            id,
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
            method,
            escalate,
            error: false,
            timestamp: Utc::now(),
        }
    }

    /// Synthetic assistant reply standing in for a failed request
    pub fn failure(id: u64) -> Self {
        Self {
            id,
            role: ChatRole::Assistant,
            content: ERROR_REPLY.to_string(),
            sources: Vec::new(),
            method: None,
            escalate: false,
            error: true,
            timestamp: Utc::now(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A citation attached to an assistant answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl Source {
    /// Label to show for the citation: title, then source name, then a generic fallback.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .or(self.source.as_deref())
            .unwrap_or("Source")
    }
}
