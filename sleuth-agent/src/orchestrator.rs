use std::sync::Arc;
use std::time::Duration;

use sleuth_core::{truncate_chars, Action, Decision, ToolResult, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    AgentConfig, AgentError, AgentRun, AgentRunResult, DecisionClient, DecisionOutcome,
    DecisionRequest, DecisionUnavailable, RegisteredTool, ToolContext, ToolRegistry,
};

const TRUNCATION_MARKER: &str = "\n\n... (remaining content truncated)";
const DECISION_GRACE: Duration = Duration::from_secs(1);

/// Drives one instruction through the decide / act / observe loop.
///
/// Holds only shared read-only collaborators; every call to [`run`](Self::run)
/// owns its own [`AgentRun`], so one orchestrator serves concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    decision: Arc<dyn DecisionClient>,
    tools: Arc<ToolRegistry>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tools", &self.tools.names())
            .finish()
    }
}

enum StepEnd {
    Continue(AgentRun),
    Done(AgentRunResult),
}

impl Orchestrator {
    pub fn new(decision: Arc<dyn DecisionClient>, tools: Arc<ToolRegistry>) -> Self {
        Self { decision, tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn run(
        &self,
        instruction: impl Into<String>,
        config: &AgentConfig,
        cancellation: &CancellationToken,
    ) -> AgentRunResult {
        let run = AgentRun::new(instruction);
        let span = tracing::info_span!(
            "agent_run",
            run_id = %run.run_id(),
            max_steps = config.max_steps,
            tool_retry_limit = config.tool_retry_limit,
        );

        async move {
            let result = self.drive(run, config, cancellation).await;
            tracing::info!(
                status = ?result.status,
                steps = result.step_count,
                error = result.error.as_ref().map(tracing::field::display),
                "agent run finished"
            );
            result
        }
        .instrument(span)
        .await
    }

    /// Runs on a fresh current-thread runtime, for callers outside of async
    /// code. Must not be called from within a tokio runtime.
    pub fn run_blocking(
        &self,
        instruction: impl Into<String>,
        config: &AgentConfig,
        cancellation: &CancellationToken,
    ) -> std::io::Result<AgentRunResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(instruction, config, cancellation)))
    }

    async fn drive(
        &self,
        mut run: AgentRun,
        config: &AgentConfig,
        cancellation: &CancellationToken,
    ) -> AgentRunResult {
        if run.instruction().trim().is_empty() {
            return run.fail(AgentError::EmptyInstruction);
        }
        if let Err(reason) = config.validate() {
            return run.fail(AgentError::InvalidConfig(reason));
        }

        let catalogue = self.tools.catalogue();

        while run.step_count() < config.max_steps {
            if cancellation.is_cancelled() {
                return run.fail(AgentError::Cancelled);
            }

            let step_index = run.step_count();
            let step_span = tracing::info_span!("agent_step", step_index);
            let step = self
                .step(run, &catalogue, config, cancellation)
                .instrument(step_span)
                .await;
            run = match step {
                StepEnd::Continue(run) => run,
                StepEnd::Done(result) => return result,
            };
        }

        tracing::warn!(max_steps = config.max_steps, "step budget exhausted");
        run.exhaust(config.exhaustion)
    }

    async fn step(
        &self,
        mut run: AgentRun,
        catalogue: &[sleuth_core::ToolSpec],
        config: &AgentConfig,
        cancellation: &CancellationToken,
    ) -> StepEnd {
        let request = DecisionRequest {
            instruction: run.instruction(),
            scratchpad: run.scratchpad(),
            catalogue,
            timeout: config.step_timeout,
        };

        // The client spends `step_timeout` across its own retries; the grace
        // only catches clients that ignore the request timeout.
        let backstop = config.step_timeout + DECISION_GRACE;
        let decided = tokio::select! {
            biased;
            _ = cancellation.cancelled() => None,
            outcome = tokio::time::timeout(backstop, self.decision.decide(request)) => {
                Some(outcome)
            }
        };

        let outcome = match decided {
            None => return StepEnd::Done(run.fail(AgentError::Cancelled)),
            Some(Err(_elapsed)) => {
                tracing::warn!(timeout = ?config.step_timeout, "decision timed out");
                run.record_step(
                    None,
                    Action::NoAction,
                    format!(
                        "step failed: no decision within {:?}",
                        config.step_timeout
                    ),
                );
                return StepEnd::Continue(run);
            }
            Some(Ok(Err(unavailable))) => {
                return StepEnd::Done(run.fail(AgentError::from(unavailable)));
            }
            Some(Ok(Ok(outcome))) => outcome,
        };

        let (thought, tool_name, arguments) = match outcome {
            DecisionOutcome::Malformed(failure) => {
                run.record_step(
                    None,
                    Action::NoAction,
                    format!(
                        "{failure}. Reply with a single JSON object containing \"thought\", \"action\" and \"action_input\"."
                    ),
                );
                return StepEnd::Continue(run);
            }
            DecisionOutcome::Decided(Decision::FinalAnswer { thought, text }) => {
                tracing::info!("final answer produced");
                run.record_step(thought, Action::FinalAnswer, text.clone());
                return StepEnd::Done(run.succeed(text));
            }
            DecisionOutcome::Decided(Decision::ToolCall {
                thought,
                tool_name,
                arguments,
            }) => (thought, tool_name, arguments),
        };

        let observation = if config.reject_repeated_calls
            && repeats_previous_call(&run, &tool_name, &arguments)
        {
            tracing::warn!(tool = %tool_name, "repeated tool call rejected");
            format!(
                "tool '{tool_name}' was already called with these arguments in the previous step; choose a different action or give the final answer"
            )
        } else if let Some(tool) = self.tools.get(&tool_name) {
            let ctx = ToolContext {
                run_id: run.run_id(),
                step_index: run.step_count(),
                attempt: 0,
                timeout: config.step_timeout,
                cancellation: cancellation.child_token(),
            };
            let retry_limit = config.tool_retry_limit;
            match execute_with_retries(tool, &arguments, ctx, retry_limit, cancellation).await {
                None => return StepEnd::Done(run.fail(AgentError::Cancelled)),
                Some(ToolResult::Observation { text }) => {
                    run.remember_tool_output(&text);
                    text
                }
                Some(ToolResult::Failure { reason, .. }) => {
                    format!("tool '{tool_name}' failed: {reason}")
                }
            }
        } else {
            tracing::warn!(tool = %tool_name, "model requested an unknown tool");
            format!(
                "unknown tool '{tool_name}'; available tools: {}",
                self.tools.names().join(", ")
            )
        };

        let observation =
            truncate_chars(&observation, config.max_observation_chars, TRUNCATION_MARKER);
        run.record_step(
            thought,
            Action::ToolCall {
                tool_name,
                arguments,
            },
            observation,
        );
        StepEnd::Continue(run)
    }
}

/// Runs `tool` once plus up to `retry_limit` immediate retries while the
/// failure is retryable. `None` means the run was cancelled mid-attempt.
async fn execute_with_retries(
    tool: &RegisteredTool,
    arguments: &Value,
    mut ctx: ToolContext,
    retry_limit: u32,
    cancellation: &CancellationToken,
) -> Option<ToolResult> {
    loop {
        tracing::debug!(tool = tool.name(), attempt = ctx.attempt, "invoking tool");
        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return None,
            result = tool.execute(arguments.clone(), &ctx) => result,
        };

        match &result {
            ToolResult::Failure {
                reason,
                retryable: true,
            } if ctx.attempt < retry_limit => {
                tracing::warn!(
                    tool = tool.name(),
                    attempt = ctx.attempt,
                    error = %reason,
                    "tool attempt failed, retrying"
                );
                ctx.attempt += 1;
            }
            ToolResult::Failure { reason, .. } => {
                tracing::warn!(tool = tool.name(), error = %reason, "tool failed");
                return Some(result);
            }
            ToolResult::Observation { .. } => return Some(result),
        }
    }
}

fn repeats_previous_call(run: &AgentRun, tool_name: &str, arguments: &Value) -> bool {
    matches!(
        run.scratchpad().last().map(|entry| &entry.action),
        Some(Action::ToolCall { tool_name: previous_name, arguments: previous_args })
            if previous_name == tool_name && previous_args == arguments
    )
}

impl From<DecisionUnavailable> for AgentError {
    fn from(unavailable: DecisionUnavailable) -> Self {
        AgentError::DecisionUnavailable {
            attempts: unavailable.attempts,
            reason: unavailable.reason,
        }
    }
}
