use serde::{Deserialize, Serialize};
use sleuth_core::{Action, Scratchpad, ScratchpadEntry};
use uuid::Uuid;

use crate::{AgentError, ExhaustionPolicy};

/// How a run ended. A run that is still going is an [`AgentRun`], not a
/// status.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
    Exhausted,
}

/// A run in progress. Terminating consumes it, so a finished run can no longer
/// be stepped or have its scratchpad touched.
#[derive(Debug)]
pub struct AgentRun {
    run_id: Uuid,
    instruction: String,
    scratchpad: Scratchpad,
    last_tool_output: Option<String>,
}

impl AgentRun {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            instruction: instruction.into(),
            scratchpad: Scratchpad::new(),
            last_tool_output: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    /// Every step appends exactly one entry, so the entry count is the step
    /// count.
    pub fn step_count(&self) -> u32 {
        self.scratchpad.len() as u32
    }

    pub fn record_step(
        &mut self,
        thought: Option<String>,
        action: Action,
        observation: impl Into<String>,
    ) -> &ScratchpadEntry {
        self.scratchpad.push(thought, action, observation)
    }

    pub(crate) fn remember_tool_output(&mut self, text: &str) {
        self.last_tool_output = Some(text.to_string());
    }

    pub fn succeed(self, answer: impl Into<String>) -> AgentRunResult {
        self.finish(RunStatus::Succeeded, Some(answer.into()), None)
    }

    pub fn fail(self, error: AgentError) -> AgentRunResult {
        self.finish(RunStatus::Failed, None, Some(error))
    }

    pub fn exhaust(mut self, policy: ExhaustionPolicy) -> AgentRunResult {
        let answer = match policy {
            ExhaustionPolicy::LeaveEmpty => None,
            ExhaustionPolicy::LastObservation => self.last_tool_output.take(),
        };
        self.finish(RunStatus::Exhausted, answer, None)
    }

    fn finish(
        self,
        status: RunStatus,
        final_answer: Option<String>,
        error: Option<AgentError>,
    ) -> AgentRunResult {
        let step_count = self.step_count();
        AgentRunResult {
            run_id: self.run_id,
            instruction: self.instruction,
            scratchpad: self.scratchpad,
            step_count,
            status,
            final_answer,
            error,
        }
    }
}

/// Terminal state of a run.
#[derive(Clone, Debug)]
pub struct AgentRunResult {
    pub run_id: Uuid,
    pub instruction: String,
    pub scratchpad: Scratchpad,
    pub step_count: u32,
    pub status: RunStatus,
    pub final_answer: Option<String>,
    pub error: Option<AgentError>,
}
