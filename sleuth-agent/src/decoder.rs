use serde_json::{Map, Value};
use sleuth_core::{to_text, Decision, LlmResponse};

use crate::DecodeFailure;

const FINAL_ANSWER_SENTINELS: [&str; 4] = ["final_answer", "final answer", "finalanswer", "finish"];

/// Turns a raw model reply into exactly one [`Decision`].
///
/// Native tool calls win over text content. Otherwise the content is searched
/// for the first JSON object carrying an `action` key, with markdown fences
/// and surrounding prose ignored.
pub fn decode_reply(response: &LlmResponse) -> Result<Decision, DecodeFailure> {
    let tool_call_count = response.tool_calls.len();
    if tool_call_count > 1 {
        return Err(DecodeFailure::new(
            describe_reply(response),
            format!("expected at most one tool call, got {tool_call_count}"),
        ));
    }

    if let Some(call) = response.tool_calls.first() {
        let tool_name = call.name.trim();
        if tool_name.is_empty() {
            return Err(DecodeFailure::new(
                describe_reply(response),
                "tool call without a name",
            ));
        }
        return Ok(Decision::ToolCall {
            thought: non_empty(response.content.trim()),
            tool_name: tool_name.to_string(),
            arguments: call.args.clone(),
        });
    }

    decode_text(&response.content)
}

pub fn decode_text(raw: &str) -> Result<Decision, DecodeFailure> {
    let cleaned = strip_fences(raw);
    let Some(object) = first_action_object(&cleaned) else {
        return Err(DecodeFailure::new(
            raw,
            "no JSON object with an \"action\" key",
        ));
    };

    let thought = object
        .get("thought")
        .and_then(Value::as_str)
        .and_then(|text| non_empty(text.trim()));

    let action = match object.get("action") {
        Some(Value::String(action)) => action.trim(),
        _ => return Err(DecodeFailure::new(raw, "\"action\" must be a string")),
    };
    if action.is_empty() {
        return Err(DecodeFailure::new(raw, "\"action\" is empty"));
    }

    let input = object.get("action_input").cloned().unwrap_or(Value::Null);

    if is_final_answer(action) {
        let text = to_text(&input);
        let text = text.trim();
        if text.is_empty() {
            return Err(DecodeFailure::new(raw, "final answer without text"));
        }
        return Ok(Decision::FinalAnswer {
            thought,
            text: text.to_string(),
        });
    }

    let arguments = match input {
        Value::Null => Value::Object(Map::new()),
        Value::String(text) => Value::String(text.trim().to_string()),
        other => other,
    };

    Ok(Decision::ToolCall {
        thought,
        tool_name: action.to_string(),
        arguments,
    })
}

fn is_final_answer(action: &str) -> bool {
    FINAL_ANSWER_SENTINELS
        .iter()
        .any(|sentinel| action.eq_ignore_ascii_case(sentinel))
}

fn strip_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_action_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .find_map(|(start, _)| {
            let mut stream =
                serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(Value::Object(map))) if map.contains_key("action") => Some(map),
                _ => None,
            }
        })
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn describe_reply(response: &LlmResponse) -> String {
    let calls: Vec<String> = response
        .tool_calls
        .iter()
        .map(|call| format!("{}({})", call.name, call.args))
        .collect();
    format!("{} [tool_calls: {}]", response.content, calls.join(", "))
}
