use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SleuthError {
    #[error("LLM provider failed: {0}")]
    LlmProvider(String),
    #[error("LLM provider rejected the credentials: {0}")]
    Unauthorized(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
