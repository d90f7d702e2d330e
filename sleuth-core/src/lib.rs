mod decision;
mod error;
mod llm;
pub mod retry;
mod scratchpad;
mod tool;
mod value;

pub use decision::Decision;
pub use error::SleuthError;
pub use llm::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallingLlm, ToolSpec};
pub use scratchpad::{Action, Scratchpad, ScratchpadEntry, TraceParseError};
pub use tool::{ToolError, ToolResult};
pub use value::{to_text, truncate_chars, Value};
