//! Wire types for the single `{instruction} -> {final_answer, scratchpad,
//! error, steps}` exchange. Transport agnostic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AgentOverrides, AgentRunResult, RunStatus};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AgentRequest {
    pub user_input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_retry_limit: Option<u32>,
}

impl AgentRequest {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            max_steps: None,
            step_timeout_secs: None,
            tool_retry_limit: None,
        }
    }

    pub fn overrides(&self) -> AgentOverrides {
        AgentOverrides {
            max_steps: self.max_steps,
            step_timeout: self.step_timeout_secs.map(Duration::from_secs),
            tool_retry_limit: self.tool_retry_limit,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AgentResponse {
    pub final_answer: Option<String>,
    /// Rendered trace, parseable with `Scratchpad::parse`.
    pub scratchpad: String,
    pub error: Option<String>,
    pub steps: u32,
    pub status: RunStatus,
}

impl From<AgentRunResult> for AgentResponse {
    fn from(result: AgentRunResult) -> Self {
        Self {
            final_answer: result.final_answer,
            scratchpad: result.scratchpad.render(),
            error: result.error.map(|error| error.to_string()),
            steps: result.step_count,
            status: result.status,
        }
    }
}
