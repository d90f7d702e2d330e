use serde::{Deserialize, Serialize};

use crate::Value;

/// What the model chose to do for one step.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        tool_name: String,
        arguments: Value,
    },
    FinalAnswer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        text: String,
    },
}

impl Decision {
    pub fn tool_call(tool_name: impl Into<String>, arguments: Value) -> Self {
        Decision::ToolCall {
            thought: None,
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn final_answer(text: impl Into<String>) -> Self {
        Decision::FinalAnswer {
            thought: None,
            text: text.into(),
        }
    }

    pub fn thought(&self) -> Option<&str> {
        match self {
            Decision::ToolCall { thought, .. } | Decision::FinalAnswer { thought, .. } => {
                thought.as_deref()
            }
        }
    }
}
