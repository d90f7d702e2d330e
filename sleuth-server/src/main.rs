use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sleuth_agent::{
    AgentRequest, AgentResponse, CancellationToken, LlmDecisionClient, Orchestrator, ToolRegistry,
};
use sleuth_llm::OpenAiCompatibleClient;
use sleuth_server::{router, telemetry, AppState, Cli, Command, Settings};
use sleuth_tools::{FetcherTool, HttpPageFetcher, ParserTool, ScraperTool, SummarizeTool};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment and flags still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    telemetry::init_tracing(&cli.settings.log_level, cli.settings.log_format)
        .context("failed to install tracing subscriber")?;

    let config = cli.settings.agent_config();
    if let Err(reason) = config.validate() {
        bail!("invalid agent configuration: {reason}");
    }
    let orchestrator = build_orchestrator(&cli.settings)?;

    match cli.command {
        Command::Serve => serve(&cli.settings, AppState::new(orchestrator, config)).await,
        Command::Run { instruction } => {
            let request = AgentRequest::new(instruction);
            let cancellation = CancellationToken::new();
            let on_interrupt = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let result = orchestrator
                .run(request.user_input, &config, &cancellation)
                .await;
            let response = AgentResponse::from(result);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn build_orchestrator(settings: &Settings) -> Result<Orchestrator> {
    let Some(api_key) = settings.api_key.as_deref() else {
        bail!("GROQ_API_KEY is not set");
    };

    let llm = OpenAiCompatibleClient::builder()
        .base_url(settings.base_url.as_str())
        .api_key(api_key)
        .model(settings.model.as_str())
        .build()
        .context("failed to build the LLM client")?;

    let fetcher = Arc::new(
        HttpPageFetcher::new(settings.scraper_timeout()).context("failed to build HTTP client")?,
    );

    let tools = ToolRegistry::builder()
        .register(ScraperTool::new(fetcher.clone()).with_max_length(settings.scraper_max_length))
        .register(FetcherTool::new(fetcher))
        .register(ParserTool)
        .register(SummarizeTool::new(Arc::new(llm.clone())))
        .build()
        .context("failed to register tools")?;

    let decision = LlmDecisionClient::new(llm).with_native_tools(settings.native_tools);

    tracing::info!(
        model = %settings.model,
        tools = ?tools.names(),
        "orchestrator ready"
    );
    Ok(Orchestrator::new(Arc::new(decision), Arc::new(tools)))
}

async fn serve(settings: &Settings, state: AppState) -> Result<()> {
    let app = router(state, settings.max_concurrent_runs);
    let addr = settings.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "sleuth listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
            }
        })
        .await
        .context("server error")
}
