use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    Failed(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ToolError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Transient(_) | ToolError::Timeout(_))
    }
}

/// Outcome of one tool attempt. Tools report every failure through this type
/// instead of returning an error to the caller.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolResult {
    Observation { text: String },
    Failure { reason: String, retryable: bool },
}

impl ToolResult {
    pub fn observation(text: impl Into<String>) -> Self {
        ToolResult::Observation { text: text.into() }
    }

    pub fn failure(reason: impl Into<String>, retryable: bool) -> Self {
        ToolResult::Failure {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn is_retryable_failure(&self) -> bool {
        matches!(self, ToolResult::Failure { retryable: true, .. })
    }
}

impl From<ToolError> for ToolResult {
    fn from(error: ToolError) -> Self {
        let retryable = error.is_retryable();
        ToolResult::Failure {
            reason: error.to_string(),
            retryable,
        }
    }
}
