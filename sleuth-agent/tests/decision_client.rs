use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sleuth_agent::{
    AgentConfig, CancellationToken, DecisionClient, DecisionOutcome, DecisionRequest,
    DecisionUnavailable, LlmDecisionClient, Orchestrator, RunStatus, ToolRegistry,
};
use sleuth_core::{
    Decision, LlmRequest, LlmResponse, Scratchpad, SleuthError, ToolCall, ToolCallingLlm, ToolSpec,
};

struct MockLlm {
    replies: Mutex<VecDeque<Result<LlmResponse, SleuthError>>>,
    calls: Arc<AtomicUsize>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    fn new(replies: Vec<Result<LlmResponse, SleuthError>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let llm = Self {
            replies: Mutex::new(replies.into()),
            calls: calls.clone(),
            requests: Mutex::new(Vec::new()),
        };
        (llm, calls)
    }
}

#[async_trait]
impl ToolCallingLlm for MockLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SleuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SleuthError::LlmProvider("script exhausted".to_string())))
    }
}

fn text(content: &str) -> Result<LlmResponse, SleuthError> {
    Ok(LlmResponse {
        content: content.to_string(),
        tool_calls: Vec::new(),
    })
}

fn catalogue() -> Vec<ToolSpec> {
    vec![ToolSpec {
        name: "scraper".to_string(),
        description: "Extract text from a page".to_string(),
        parameters: json!({"type": "object"}),
    }]
}

async fn decide(client: &impl DecisionClient) -> Result<DecisionOutcome, DecisionUnavailable> {
    let scratchpad = Scratchpad::new();
    let catalogue = catalogue();
    client
        .decide(DecisionRequest {
            instruction: "scrape https://example.com",
            scratchpad: &scratchpad,
            catalogue: &catalogue,
            timeout: Duration::from_secs(5),
        })
        .await
}

#[tokio::test]
async fn decodes_json_reply_into_tool_call() {
    let (llm, _calls) = MockLlm::new(vec![text(
        r#"{"thought": "fetch it", "action": "scraper", "action_input": {"url": "https://example.com"}}"#,
    )]);
    let client = LlmDecisionClient::new(llm);

    let outcome = decide(&client).await.unwrap();

    assert_eq!(
        outcome,
        DecisionOutcome::Decided(Decision::ToolCall {
            thought: Some("fetch it".to_string()),
            tool_name: "scraper".to_string(),
            arguments: json!({"url": "https://example.com"}),
        })
    );
}

#[tokio::test]
async fn unparseable_reply_is_malformed_not_an_error() {
    let (llm, _calls) = MockLlm::new(vec![text("I would rather chat")]);
    let client = LlmDecisionClient::new(llm);

    match decide(&client).await.unwrap() {
        DecisionOutcome::Malformed(failure) => assert_eq!(failure.raw, "I would rather chat"),
        other => panic!("expected malformed outcome, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn retryable_errors_are_retried_then_succeed() {
    let (llm, calls) = MockLlm::new(vec![
        Err(SleuthError::LlmProvider("503".to_string())),
        text(r#"{"action": "final_answer", "action_input": "42"}"#),
    ]);
    let client = LlmDecisionClient::new(llm).with_retry_attempts(2);

    let outcome = decide(&client).await.unwrap();

    assert_eq!(outcome, DecisionOutcome::Decided(Decision::final_answer("42")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_are_unavailable() {
    let (llm, calls) = MockLlm::new(vec![
        Err(SleuthError::LlmProvider("502".to_string())),
        Err(SleuthError::LlmProvider("502".to_string())),
    ]);
    let client = LlmDecisionClient::new(llm)
        .with_retry_attempts(1)
        .with_retry_backoff(Duration::from_millis(10));

    let unavailable = decide(&client).await.unwrap_err();

    assert_eq!(unavailable.attempts, 2);
    assert!(unavailable.reason.contains("502"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unauthorized_fails_without_retry() {
    let (llm, calls) = MockLlm::new(vec![Err(SleuthError::Unauthorized(
        "status 401".to_string(),
    ))]);
    let client = LlmDecisionClient::new(llm).with_retry_attempts(5);

    let unavailable = decide(&client).await.unwrap_err();

    assert_eq!(unavailable.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn native_tools_are_sent_and_decoded() {
    let (llm, _calls) = MockLlm::new(vec![Ok(LlmResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: "call_1".to_string(),
            name: "scraper".to_string(),
            args: json!({"url": "https://example.com"}),
        }],
    })]);
    let llm = Arc::new(llm);
    let client = LlmDecisionClient::new(SharedLlm(llm.clone())).with_native_tools(true);

    let outcome = decide(&client).await.unwrap();

    assert!(matches!(
        outcome,
        DecisionOutcome::Decided(Decision::ToolCall { ref tool_name, .. }) if tool_name == "scraper"
    ));
    let requests = llm.requests.lock().unwrap();
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.1));
}

struct SharedLlm(Arc<MockLlm>);

#[async_trait]
impl ToolCallingLlm for SharedLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SleuthError> {
        self.0.invoke(request).await
    }
}

/// Never answers; counts how often it was asked.
struct HangingLlm(Arc<AtomicUsize>);

#[async_trait]
impl ToolCallingLlm for HangingLlm {
    async fn invoke(&self, _request: LlmRequest) -> Result<LlmResponse, SleuthError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn attempt_timeouts_share_the_request_budget() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = LlmDecisionClient::new(HangingLlm(calls.clone()))
        .with_retry_attempts(2)
        .with_retry_backoff(Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    let unavailable = decide(&client).await.unwrap_err();

    assert_eq!(unavailable.attempts, 3);
    assert!(unavailable.reason.contains("timed out"), "{}", unavailable.reason);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn hanging_model_fails_the_run_after_client_retries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = LlmDecisionClient::new(HangingLlm(calls.clone()))
        .with_retry_attempts(2)
        .with_retry_backoff(Duration::from_millis(100));
    let agent = Orchestrator::new(Arc::new(client), Arc::new(ToolRegistry::default()));
    let config = AgentConfig {
        max_steps: 3,
        step_timeout: Duration::from_secs(1),
        ..AgentConfig::default()
    };

    let result = agent
        .run("scrape https://example.com", &config, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.step_count, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(result
        .error
        .unwrap()
        .to_string()
        .starts_with("decision service unavailable after 3 attempt(s)"));
}
