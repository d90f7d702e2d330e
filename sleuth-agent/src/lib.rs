//! Bounded ReAct orchestration: decide, act, observe, until a final answer,
//! budget exhaustion or a run-level failure.

mod boundary;
mod config;
mod decision;
pub mod decoder;
mod error;
mod orchestrator;
pub mod prompt;
mod run;
mod tooling;

pub use boundary::{AgentRequest, AgentResponse};
pub use config::{AgentConfig, AgentOverrides, ExhaustionPolicy};
pub use decision::{
    DecisionClient, DecisionOutcome, DecisionRequest, DecisionUnavailable, DecodeFailure,
    LlmDecisionClient,
};
pub use error::AgentError;
pub use orchestrator::Orchestrator;
pub use run::{AgentRun, AgentRunResult, RunStatus};
pub use tooling::{
    CancellationToken, RegisteredTool, ToolContext, ToolRegistry, ToolRegistryBuilder,
    ToolRegistryError, TypedTool,
};
