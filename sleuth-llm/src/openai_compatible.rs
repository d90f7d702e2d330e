//! Generic OpenAI-compatible LLM client
//!
//! Works with any provider exposing OpenAI's chat-completions format. Groq is
//! the default target.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sleuth_core::{LlmRequest, LlmResponse, Role, SleuthError, ToolCall, ToolCallingLlm, ToolSpec};
use url::Url;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunction,
}

#[derive(Serialize, Debug, Clone)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<ToolSpec> for WireTool {
    fn from(spec: ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: spec.name,
                description: spec.description,
                parameters: spec.parameters,
            },
        }
    }
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseToolCall {
    pub id: String,
    pub function: ResponseFunction,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseFunction {
    pub name: String,
    /// JSON-encoded arguments, as a string.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    fn build_body(&self, request: LlmRequest) -> ChatCompletionRequest {
        let LlmRequest {
            messages,
            tools,
            temperature,
            max_tokens,
        } = request;

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|message| WireMessage {
                    role: message.role,
                    content: message.content,
                })
                .collect(),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.into_iter().map(WireTool::from).collect())
            },
            temperature: temperature.or(self.temperature),
            max_tokens: max_tokens.or(self.max_tokens),
            stream: false,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> SleuthError {
        if err.is_timeout() {
            SleuthError::Timeout(self.timeout)
        } else {
            SleuthError::LlmProvider(format!("transport error: {err}"))
        }
    }
}

#[async_trait::async_trait]
impl ToolCallingLlm for OpenAiCompatibleClient {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SleuthError> {
        let body = self.build_body(request);
        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&raw)
                .map(|parsed| parsed.error.message)
                .unwrap_or(raw);
            return Err(map_status_error(status, &message));
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| SleuthError::LlmProvider(format!("malformed response body: {err}")))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion usage"
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SleuthError::LlmProvider("response contained no choices".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    args: parse_arguments(call.function.arguments),
                    name: call.function.name,
                })
                .collect(),
        })
    }
}

fn parse_arguments(arguments: String) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(&arguments).unwrap_or(Value::String(arguments))
}

fn map_status_error(status: reqwest::StatusCode, message: &str) -> SleuthError {
    let code = status.as_u16();
    match code {
        401 | 403 => SleuthError::Unauthorized(format!("status {code}: {message}")),
        429 | 500..=599 => SleuthError::LlmProvider(format!("status {code}: {message}")),
        _ => SleuthError::InvalidConfig(format!(
            "provider rejected the request with status {code}: {message}"
        )),
    }
}

#[derive(Default, Clone)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<String>,
    api_key: Option<SecretString>,
    model: Option<String>,
    timeout: Option<Duration>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl fmt::Debug for OpenAiCompatibleBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };

        f.debug_struct("OpenAiCompatibleBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &api_key)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiCompatibleBuilder {
    /// Defaults to Groq's OpenAI endpoint.
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.api_key = if value.trim().is_empty() {
            None
        } else {
            Some(SecretString::new(value))
        };
        self
    }

    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.model = Some(value.into());
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    /// Used when a request does not carry its own temperature.
    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, SleuthError> {
        let api_key = self
            .api_key
            .ok_or_else(|| SleuthError::InvalidConfig("api_key is required".to_string()))?;

        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(SleuthError::InvalidConfig("model cannot be empty".to_string()));
        }

        let endpoint = chat_completions_url(self.base_url.as_deref().unwrap_or(GROQ_BASE_URL))?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(30));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SleuthError::InvalidConfig(format!("http client: {err}")))?;

        Ok(OpenAiCompatibleClient {
            http,
            endpoint,
            api_key,
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout,
        })
    }
}

fn chat_completions_url(base_url: &str) -> Result<Url, SleuthError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|url| url.join("chat/completions"))
        .map_err(|err| SleuthError::InvalidConfig(format!("invalid base_url {base_url:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_the_base_path() {
        let url = chat_completions_url(GROQ_BASE_URL).unwrap();
        assert_eq!(url.as_str(), "https://api.groq.com/openai/v1/chat/completions");

        let url = chat_completions_url("http://localhost:8080/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/chat/completions");
    }

    #[test]
    fn string_arguments_that_are_not_json_stay_strings() {
        assert_eq!(parse_arguments("{\"url\":\"x\"}".to_string())["url"], "x");
        assert_eq!(
            parse_arguments("https://example.com".to_string()),
            Value::String("https://example.com".to_string())
        );
        assert!(parse_arguments(String::new()).is_object());
    }

    #[test]
    fn status_mapping_separates_retryable_errors() {
        use sleuth_core::retry::is_retryable;

        let unauthorized = map_status_error(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(unauthorized, SleuthError::Unauthorized(_)));
        assert!(is_retryable(&map_status_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down"
        )));
        assert!(is_retryable(&map_status_error(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream"
        )));
        assert!(!is_retryable(&map_status_error(
            reqwest::StatusCode::BAD_REQUEST,
            "unknown model"
        )));
    }
}
