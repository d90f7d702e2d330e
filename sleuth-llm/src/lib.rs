//! Chat-completions clients implementing [`sleuth_core::ToolCallingLlm`].

pub mod openai_compatible;

pub use openai_compatible::{
    ChatCompletionRequest, OpenAiCompatibleBuilder, OpenAiCompatibleClient, DEFAULT_MODEL,
    GROQ_BASE_URL,
};
pub use sleuth_core::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolSpec};
