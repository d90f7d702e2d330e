use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sleuth_core::{SleuthError, ToolCallingLlm};
use sleuth_llm::{LlmRequest, Message, OpenAiCompatibleClient, ToolSpec};

fn client_for(server: &MockServer) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::builder()
        .base_url(server.url("/openai/v1"))
        .api_key("test-key")
        .model("llama-3.3-70b-versatile")
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client")
}

fn request() -> LlmRequest {
    LlmRequest::new(vec![
        Message::system("reply in JSON"),
        Message::user("scrape https://example.com"),
    ])
}

#[tokio::test]
async fn invoke_maps_text_content() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/openai/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .json_body_partial(r#"{"model": "llama-3.3-70b-versatile", "stream": false}"#);
        then.status(200).json_body(json!({
            "id": "chatcmpl-1",
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"action\": \"final_answer\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }));
    });

    let response = client_for(&server).invoke(request()).await.expect("invoke");

    assert_eq!(response.content, "{\"action\": \"final_answer\"}");
    assert!(response.tool_calls.is_empty());
    mock.assert();
}

#[tokio::test]
async fn invoke_sends_tools_and_decodes_tool_calls() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/openai/v1/chat/completions")
            .json_body_partial(
                r#"{"tools": [{"type": "function", "function": {"name": "scraper"}}], "temperature": 0.5}"#,
            );
        then.status(200).json_body(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "scraper", "arguments": "{\"url\":\"https://example.com\"}"}
                    }]
                }
            }]
        }));
    });

    let mut request = request();
    request.tools.push(ToolSpec {
        name: "scraper".to_string(),
        description: "Extract page text".to_string(),
        parameters: json!({"type": "object", "properties": {"url": {"type": "string"}}}),
    });
    request.temperature = Some(0.5);

    let response = client_for(&server).invoke(request).await.expect("invoke");

    assert_eq!(response.content, "");
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "scraper");
    assert_eq!(response.tool_calls[0].args["url"], "https://example.com");
    mock.assert();
}

#[tokio::test]
async fn unauthorized_status_is_not_retryable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(401).json_body(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error", "code": "invalid_api_key"}
        }));
    });

    let err = client_for(&server).invoke(request()).await.unwrap_err();

    match err {
        SleuthError::Unauthorized(message) => assert!(message.contains("Invalid API Key")),
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_reported_as_provider_failures() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(503).body("upstream overloaded");
    });

    let err = client_for(&server).invoke(request()).await.unwrap_err();

    assert!(sleuth_core::retry::is_retryable(&err));
    assert!(err.to_string().contains("status 503: upstream overloaded"));
}

#[tokio::test]
async fn empty_choices_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/openai/v1/chat/completions");
        then.status(200).json_body(json!({"choices": []}));
    });

    let err = client_for(&server).invoke(request()).await.unwrap_err();

    assert!(err.to_string().contains("no choices"));
}

#[test]
fn builder_requires_an_api_key() {
    let err = OpenAiCompatibleClient::builder()
        .api_key("   ")
        .build()
        .unwrap_err();
    assert!(matches!(err, SleuthError::InvalidConfig(_)));
}

#[test]
fn debug_output_redacts_the_api_key() {
    let builder = OpenAiCompatibleClient::builder().api_key("super-secret");
    assert!(!format!("{builder:?}").contains("super-secret"));

    let client = builder.build().expect("client");
    let rendered = format!("{client:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("api.groq.com"));
    assert_eq!(client.model(), "llama-3.3-70b-versatile");
}
