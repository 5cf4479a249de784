pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::error::BackendError;

pub use client::{BackendClient, DEFAULT_BASE_URL, REQUEST_TIMEOUT};
pub use models::{ChatResponse, HistoryEntry, SessionHistory};

/// Anything that can answer a chat message.
///
/// `BackendClient` is the production implementation; tests drive the
/// conversation with scripted doubles.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, BackendError>;
}
