//! Error types for the Stride domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum.

use thiserror::Error;

/// The top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Context store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Text generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid user key: {0}")]
    InvalidKey(String),

    #[error("Corrupt record for {user_id}: {reason}")]
    Corrupt { user_id: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Agent execution failed: {agent_id}: {reason}")]
    ExecutionFailed { agent_id: String, reason: String },

    #[error("Agent task aborted: {agent_id}: {reason}")]
    Aborted { agent_id: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Generator not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Generation timed out: {0}")]
    Timeout(String),

    #[error("Unparsable tip payload: {0}")]
    Parse(String),
}
