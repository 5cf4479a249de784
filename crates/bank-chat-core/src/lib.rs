pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod state;

// Re-export main types for convenience
pub use api::{
    BackendClient, ChatBackend, ChatResponse, SessionHistory, DEFAULT_BASE_URL, REQUEST_TIMEOUT,
};
pub use config::Config;
pub use conversation::{Conversation, PendingSend};
pub use error::{BackendError, ConversationError};
pub use state::{ChatMessage, ChatRole, Source, ERROR_REPLY};
