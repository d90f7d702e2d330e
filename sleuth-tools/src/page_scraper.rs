use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use sleuth_agent::{ToolContext, TypedTool};
use sleuth_core::{truncate_chars, ToolError};

use crate::html::{collapse_whitespace, extract_semantic_text};
use crate::page::{normalize_url, PageFetcher};

pub const DEFAULT_MAX_LENGTH: usize = 15_000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScraperArgs {
    /// Full URL of the page. `https://` is assumed when no scheme is given.
    pub url: String,
}

/// Extracts the readable text of a web page.
pub struct ScraperTool {
    fetcher: Arc<dyn PageFetcher>,
    max_length: usize,
}

impl ScraperTool {
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
impl TypedTool for ScraperTool {
    type Args = ScraperArgs;

    const NAME: &'static str = "scraper";
    const PRIMARY_ARG: Option<&'static str> = Some("url");

    fn description(&self) -> String {
        "Extract clean readable text (title, headings, paragraphs, list items) from a web page. Input: the full URL.".to_string()
    }

    async fn run(&self, args: ScraperArgs, ctx: ToolContext) -> Result<String, ToolError> {
        let url = normalize_url(&args.url)?;
        tracing::info!(url = %url, attempt = ctx.attempt, "scraping page");

        let page = self.fetcher.fetch(&url, &ctx).await?;
        page.ensure_success()?;

        if !page.is_textual() {
            return Err(ToolError::Failed(format!(
                "{} returned {} content; only text pages can be scraped",
                page.final_url,
                page.content_type.as_deref().unwrap_or("unknown")
            )));
        }

        let text = if page.is_html() {
            extract_semantic_text(&page.body)
        } else {
            collapse_whitespace(&page.body)
        };

        if text.trim().is_empty() {
            return Err(ToolError::Failed(format!(
                "no readable text found at {} (the page may need JavaScript or a login)",
                page.final_url
            )));
        }

        Ok(truncate_chars(
            &text,
            self.max_length,
            "\n\n... (content truncated)",
        ))
    }
}
