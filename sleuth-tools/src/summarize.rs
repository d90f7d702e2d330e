use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use sleuth_agent::{ToolContext, TypedTool};
use sleuth_core::retry::is_retryable;
use sleuth_core::{LlmRequest, Message, ToolCallingLlm, ToolError};

pub const DEFAULT_MAX_INPUT_CHARS: usize = 120_000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SummarizeArgs {
    /// Text to summarize.
    pub text: String,
    /// Language of the summary. Defaults to the language of the text.
    #[serde(default)]
    pub language: Option<String>,
}

/// Condenses text through a chat model.
pub struct SummarizeTool {
    llm: Arc<dyn ToolCallingLlm>,
    max_input_chars: usize,
}

impl SummarizeTool {
    pub fn new(llm: Arc<dyn ToolCallingLlm>) -> Self {
        Self {
            llm,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }
}

fn summary_prompt(language: Option<&str>) -> String {
    let language = match language.map(str::trim).filter(|value| !value.is_empty()) {
        Some(language) => format!("Write the summary in {language}."),
        None => "Write the summary in the same language as the content.".to_string(),
    };
    format!(
        "You are a professional summarizer. Create a concise, well-structured summary of the content the user sends.\n\
         - {language}\n\
         - Focus on the most important information.\n\
         - Be clear and direct.\n\
         - Plain text only, no markdown."
    )
}

#[async_trait::async_trait]
impl TypedTool for SummarizeTool {
    type Args = SummarizeArgs;

    const NAME: &'static str = "summarize";
    const PRIMARY_ARG: Option<&'static str> = Some("text");

    fn description(&self) -> String {
        "Summarize a block of text (for example scraped page content). Input: {\"text\": \"...\", \"language\": optional}.".to_string()
    }

    async fn run(&self, args: SummarizeArgs, _ctx: ToolContext) -> Result<String, ToolError> {
        let text = args.text.trim();
        if text.is_empty() {
            return Err(ToolError::InvalidInput("nothing to summarize".to_string()));
        }
        let length = text.chars().count();
        if length > self.max_input_chars {
            return Err(ToolError::InvalidInput(format!(
                "text is {length} characters; the limit is {}",
                self.max_input_chars
            )));
        }

        let mut request = LlmRequest::new(vec![
            Message::system(summary_prompt(args.language.as_deref())),
            Message::user(text),
        ]);
        request.temperature = Some(0.1);

        let response = self.llm.invoke(request).await.map_err(|err| {
            if is_retryable(&err) {
                ToolError::Transient(err.to_string())
            } else {
                ToolError::Failed(err.to_string())
            }
        })?;

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(ToolError::Failed("model returned an empty summary".to_string()));
        }
        Ok(summary.to_string())
    }
}
