use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use sleuth_agent::{
    AgentConfig, CancellationToken, DecisionClient, DecisionOutcome, DecisionRequest,
    DecisionUnavailable, Orchestrator, RunStatus, ToolContext, ToolRegistry, TypedTool,
};
use sleuth_core::{Action, Decision, ToolError};

/// Issues one unknown-tool call, then cancels the run and stalls.
struct CancellingClient {
    token: CancellationToken,
    calls: AtomicUsize,
}

#[async_trait]
impl DecisionClient for CancellingClient {
    async fn decide(
        &self,
        _request: DecisionRequest<'_>,
    ) -> Result<DecisionOutcome, DecisionUnavailable> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(DecisionOutcome::Decided(Decision::tool_call(
                "missing",
                json!({}),
            )));
        }
        self.token.cancel();
        std::future::pending().await
    }
}

fn config() -> AgentConfig {
    AgentConfig {
        max_steps: 5,
        step_timeout: Duration::from_secs(30),
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn cancellation_mid_run_keeps_completed_steps() {
    let token = CancellationToken::new();
    let client = Arc::new(CancellingClient {
        token: token.clone(),
        calls: AtomicUsize::new(0),
    });
    let agent = Orchestrator::new(client, Arc::new(ToolRegistry::default()));

    let result = agent.run("scrape something", &config(), &token).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.error.unwrap().to_string(), "cancelled");
    assert_eq!(result.step_count, 1);
    assert!(result.scratchpad.entries()[0]
        .observation
        .starts_with("unknown tool 'missing'"));
}

#[tokio::test]
async fn cancelled_before_start_takes_no_steps() {
    let token = CancellationToken::new();
    token.cancel();
    let client = Arc::new(CancellingClient {
        token: token.clone(),
        calls: AtomicUsize::new(0),
    });
    let agent = Orchestrator::new(client.clone(), Arc::new(ToolRegistry::default()));

    let result = agent.run("scrape something", &config(), &token).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.step_count, 0);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

/// First an unknown tool, then `stall` on every later step.
struct StallScript {
    calls: AtomicUsize,
}

#[async_trait]
impl DecisionClient for StallScript {
    async fn decide(
        &self,
        _request: DecisionRequest<'_>,
    ) -> Result<DecisionOutcome, DecisionUnavailable> {
        let tool = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            "missing"
        } else {
            "stall"
        };
        Ok(DecisionOutcome::Decided(Decision::tool_call(tool, json!({}))))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NoArgs {}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Cancels the whole run from inside its own call and never returns.
struct StallTool {
    run_token: CancellationToken,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl TypedTool for StallTool {
    type Args = NoArgs;
    const NAME: &'static str = "stall";

    fn description(&self) -> String {
        "Holds a resource forever".to_string()
    }

    async fn run(&self, _args: NoArgs, _ctx: ToolContext) -> Result<String, ToolError> {
        let _resource = SetOnDrop(self.released.clone());
        self.run_token.cancel();
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancellation_interrupts_an_in_flight_tool_and_releases_it() {
    let token = CancellationToken::new();
    let released = Arc::new(AtomicBool::new(false));
    let tools = ToolRegistry::builder()
        .register(StallTool {
            run_token: token.clone(),
            released: released.clone(),
        })
        .build()
        .unwrap();
    let client = Arc::new(StallScript {
        calls: AtomicUsize::new(0),
    });
    let agent = Orchestrator::new(client, Arc::new(tools));

    let result = agent.run("hold on", &config(), &token).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.error.unwrap().to_string(), "cancelled");
    assert_eq!(result.step_count, 1);
    assert!(matches!(
        result.scratchpad.entries()[0].action,
        Action::ToolCall { ref tool_name, .. } if tool_name == "missing"
    ));
    assert!(released.load(Ordering::SeqCst));
}
