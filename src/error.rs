//! Error types for the support assistant

use thiserror::Error;

/// Result type alias for support assistant operations
pub type Result<T> = std::result::Result<T, SupportError>;

#[derive(Error, Debug)]
pub enum SupportError {

    // =============================
    // Turn / Session Errors
    // =============================

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("A previous message is still being processed")]
    Busy,

    #[error("Assistant session not initialized; start a chat first")]
    SessionNotInitialized,

    #[error("GEMINI_API_KEY (or API_KEY) environment variable not set")]
    MissingApiKey,

    #[error("Exceeded {0} tool-call rounds without a final answer")]
    ToolRoundsExceeded(usize),

    #[error("Assistant turn timed out after {0} seconds")]
    Timeout(u64),

    // =============================
    // Tool Errors
    // =============================

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Model / Data Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("FAQ data error: {0}")]
    FaqData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
