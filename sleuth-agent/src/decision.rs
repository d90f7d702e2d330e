use std::time::Duration;

use sleuth_core::retry::is_retryable;
use sleuth_core::{Decision, LlmRequest, Scratchpad, SleuthError, ToolCallingLlm, ToolSpec};
use tokio::time::Instant;

use crate::{decoder, prompt};

/// Inputs for one decision. Borrowed from the run so the scratchpad is never
/// copied per step.
#[derive(Clone, Copy, Debug)]
pub struct DecisionRequest<'a> {
    pub instruction: &'a str,
    pub scratchpad: &'a Scratchpad,
    pub catalogue: &'a [ToolSpec],
    pub timeout: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DecisionOutcome {
    Decided(Decision),
    Malformed(DecodeFailure),
}

/// The model answered but the reply could not be turned into a decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeFailure {
    pub raw: String,
    pub reason: String,
}

impl DecodeFailure {
    pub fn new(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "could not decode decision: {}", self.reason)
    }
}

/// The decision service could not produce any reply within its retry budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionUnavailable {
    pub attempts: u32,
    pub reason: String,
}

impl std::fmt::Display for DecisionUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "decision service unavailable after {} attempt(s): {}",
            self.attempts, self.reason
        )
    }
}

impl std::error::Error for DecisionUnavailable {}

#[async_trait::async_trait]
pub trait DecisionClient: Send + Sync {
    async fn decide(
        &self,
        request: DecisionRequest<'_>,
    ) -> Result<DecisionOutcome, DecisionUnavailable>;
}

/// Decision client backed by any chat model.
///
/// `request.timeout` bounds the whole call, attempts and backoff included.
/// Retryable provider errors (timeouts among them) are retried
/// `retry_attempts` more times with a fixed backoff; anything else fails at
/// once.
pub struct LlmDecisionClient<L> {
    llm: L,
    retry_attempts: u32,
    retry_backoff: Duration,
    native_tools: bool,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl<L> std::fmt::Debug for LlmDecisionClient<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmDecisionClient")
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .field("native_tools", &self.native_tools)
            .finish()
    }
}

impl<L> LlmDecisionClient<L>
where
    L: ToolCallingLlm,
{
    pub fn new(llm: L) -> Self {
        Self {
            llm,
            retry_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            native_tools: false,
            temperature: Some(0.1),
            max_tokens: Some(1024),
        }
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Also send the catalogue as provider tool definitions.
    pub fn with_native_tools(mut self, native_tools: bool) -> Self {
        self.native_tools = native_tools;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Splits what is left of the request timeout evenly over the remaining
    /// attempts, keeping room for the backoff between them.
    fn attempt_timeout(&self, deadline: Instant, attempts_left: u32) -> Duration {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let attempts_left = attempts_left.max(1);
        let backoffs = self.retry_backoff.saturating_mul(attempts_left - 1);
        let share = remaining.saturating_sub(backoffs) / attempts_left;
        if share.is_zero() {
            remaining / attempts_left
        } else {
            share
        }
    }

    fn build_request(&self, request: &DecisionRequest<'_>) -> LlmRequest {
        let mut llm_request = LlmRequest::new(prompt::build_messages(request));
        if self.native_tools {
            llm_request.tools = request.catalogue.to_vec();
        }
        llm_request.temperature = self.temperature;
        llm_request.max_tokens = self.max_tokens;
        llm_request
    }
}

#[async_trait::async_trait]
impl<L> DecisionClient for LlmDecisionClient<L>
where
    L: ToolCallingLlm,
{
    async fn decide(
        &self,
        request: DecisionRequest<'_>,
    ) -> Result<DecisionOutcome, DecisionUnavailable> {
        let llm_request = self.build_request(&request);
        let max_attempts = self.retry_attempts + 1;
        let deadline = Instant::now() + request.timeout;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let attempt_timeout = self.attempt_timeout(deadline, max_attempts - attempts + 1);
            let result = match tokio::time::timeout(
                attempt_timeout,
                self.llm.invoke(llm_request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SleuthError::Timeout(attempt_timeout)),
            };

            match result {
                Ok(response) => {
                    return Ok(match decoder::decode_reply(&response) {
                        Ok(decision) => DecisionOutcome::Decided(decision),
                        Err(failure) => {
                            tracing::warn!(
                                reason = %failure.reason,
                                "model reply could not be decoded"
                            );
                            DecisionOutcome::Malformed(failure)
                        }
                    });
                }
                Err(error) if is_retryable(&error) && attempts < max_attempts => {
                    tracing::warn!(
                        error = %error,
                        attempt = attempts,
                        max_attempts,
                        "decision request failed, retrying"
                    );
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    tokio::time::sleep(self.retry_backoff.min(remaining)).await;
                }
                Err(error) => {
                    tracing::error!(error = %error, attempts, "decision service unavailable");
                    return Err(DecisionUnavailable {
                        attempts,
                        reason: error.to_string(),
                    });
                }
            }
        }
    }
}
