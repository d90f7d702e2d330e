use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sleuth_agent::{AgentConfig, ExhaustionPolicy};
use sleuth_llm::{DEFAULT_MODEL, GROQ_BASE_URL};

/// Bounded ReAct agent that scrapes, parses and summarizes web pages.
#[derive(Parser, Debug)]
#[command(name = "sleuth", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Run one instruction and print the JSON response.
    Run {
        /// What the agent should do, e.g. "summarize https://example.com".
        instruction: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// API key for the chat-completions provider.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Any OpenAI-compatible endpoint.
    #[arg(long, env = "LLM_BASE_URL", default_value = GROQ_BASE_URL, global = true)]
    pub base_url: String,

    /// Ask the provider for native tool calls instead of JSON text replies.
    #[arg(long, env = "LLM_NATIVE_TOOLS", global = true)]
    pub native_tools: bool,

    /// Step budget per run.
    #[arg(long, env = "MAX_ITERATIONS", default_value_t = 10, global = true)]
    pub max_iterations: u32,

    #[arg(long, env = "STEP_TIMEOUT_SECS", default_value_t = 45, global = true)]
    pub step_timeout_secs: u64,

    #[arg(long, env = "TOOL_RETRY_LIMIT", default_value_t = 2, global = true)]
    pub tool_retry_limit: u32,

    /// `leave_empty` or `last_observation`.
    #[arg(long, env = "EXHAUSTION_POLICY", default_value = "leave_empty", global = true)]
    pub exhaustion_policy: ExhaustionPolicy,

    /// Reject a tool call identical to the previous step's.
    #[arg(long, env = "REJECT_REPEATED_CALLS", global = true)]
    pub reject_repeated_calls: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000, global = true)]
    pub port: u16,

    #[arg(long, env = "MAX_CONCURRENT_RUNS", default_value_t = 16, global = true)]
    pub max_concurrent_runs: usize,

    #[arg(long, env = "SCRAPER_MAX_LENGTH", default_value_t = 15_000, global = true)]
    pub scraper_max_length: usize,

    #[arg(long, env = "SCRAPER_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub scraper_timeout_secs: u64,
}

impl Settings {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_steps: self.max_iterations,
            step_timeout: Duration::from_secs(self.step_timeout_secs),
            tool_retry_limit: self.tool_retry_limit,
            exhaustion: self.exhaustion_policy,
            reject_repeated_calls: self.reject_repeated_calls,
            ..AgentConfig::default()
        }
    }

    pub fn scraper_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
