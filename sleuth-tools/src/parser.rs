use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use sleuth_agent::{ToolContext, TypedTool};
use sleuth_core::ToolError;

const EMAIL_PATTERN: &str = r"[\w.+-]+@[\w-]+(?:\.[\w-]+)*\.[A-Za-z]{2,}";
const URL_PATTERN: &str = r#"https?://[^\s<>"'()\[\]]+"#;

#[derive(Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    Emails,
    Urls,
}

impl ParseMode {
    fn from_word(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "emails" | "email" => Some(ParseMode::Emails),
            "urls" | "url" | "links" => Some(ParseMode::Urls),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ParserArgs {
    /// What to extract. When omitted, the first line of `text` names the mode.
    #[serde(default)]
    pub mode: Option<ParseMode>,
    /// Text to search.
    pub text: String,
}

/// Pulls email addresses or URLs out of a block of text.
#[derive(Debug, Default)]
pub struct ParserTool;

#[async_trait::async_trait]
impl TypedTool for ParserTool {
    type Args = ParserArgs;

    const NAME: &'static str = "parser";
    const PRIMARY_ARG: Option<&'static str> = Some("text");

    fn description(&self) -> String {
        "Extract all email addresses or URLs from text. Input: {\"mode\": \"emails\" | \"urls\", \"text\": \"...\"}.".to_string()
    }

    async fn run(&self, args: ParserArgs, _ctx: ToolContext) -> Result<String, ToolError> {
        let (mode, text) = match args.mode {
            Some(mode) => (mode, args.text),
            None => split_mode_line(&args.text)?,
        };

        let (pattern, label) = match mode {
            ParseMode::Emails => (EMAIL_PATTERN, "emails"),
            ParseMode::Urls => (URL_PATTERN, "URLs"),
        };
        let regex = Regex::new(pattern).map_err(|err| ToolError::Failed(err.to_string()))?;

        let mut found: Vec<&str> = Vec::new();
        for matched in regex.find_iter(&text) {
            let value = matched
                .as_str()
                .trim_end_matches(|ch: char| matches!(ch, '.' | ',' | ';' | ':' | '!' | '?'));
            if !found.contains(&value) {
                found.push(value);
            }
        }

        if found.is_empty() {
            Ok(format!("No {label} found."))
        } else {
            Ok(found.join(", "))
        }
    }
}

fn split_mode_line(input: &str) -> Result<(ParseMode, String), ToolError> {
    let input = input.trim_start();
    let (first, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
    let mode = ParseMode::from_word(first).ok_or_else(|| {
        ToolError::InvalidInput(format!(
            "unknown parser mode '{}'; use 'emails' or 'urls'",
            first.trim()
        ))
    })?;
    Ok((mode, rest.to_string()))
}
