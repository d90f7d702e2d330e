use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use sleuth_agent::{ToolContext, TypedTool};
use sleuth_core::{truncate_chars, ToolError};

use crate::page::{normalize_url, PageFetcher};

pub const DEFAULT_MAX_LENGTH: usize = 10_000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetcherArgs {
    /// URL to download. `https://` is assumed when no scheme is given.
    pub url: String,
}

/// Returns the raw response body of a URL, markup included.
pub struct FetcherTool {
    fetcher: Arc<dyn PageFetcher>,
    max_length: usize,
}

impl FetcherTool {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }
}

#[async_trait::async_trait]
impl TypedTool for FetcherTool {
    type Args = FetcherArgs;

    const NAME: &'static str = "fetcher";
    const PRIMARY_ARG: Option<&'static str> = Some("url");

    fn description(&self) -> String {
        "Fetch the raw body (HTML, JSON, text) of a URL. Input: the full URL.".to_string()
    }

    async fn run(&self, args: FetcherArgs, ctx: ToolContext) -> Result<String, ToolError> {
        let url = normalize_url(&args.url)?;
        tracing::info!(url = %url, attempt = ctx.attempt, "fetching raw page");

        let page = self.fetcher.fetch(&url, &ctx).await?;
        page.ensure_success()?;

        if !page.is_textual() {
            return Err(ToolError::Failed(format!(
                "{} returned binary content ({})",
                page.final_url,
                page.content_type.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(truncate_chars(&page.body, self.max_length, "\n... (truncated)"))
    }
}
