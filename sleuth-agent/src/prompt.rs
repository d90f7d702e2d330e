//! Prompt templates for the decision model.

use sleuth_core::{Message, ToolSpec};

use crate::DecisionRequest;

/// Build the system prompt with the tool catalogue and the reply contract.
pub fn build_system_prompt(catalogue: &[ToolSpec]) -> String {
    let tool_descriptions = if catalogue.is_empty() {
        "(no tools are available; answer directly)".to_string()
    } else {
        catalogue
            .iter()
            .map(|tool| {
                format!(
                    "- **{}**: {}\n  arguments schema: {}",
                    tool.name, tool.description, tool.parameters
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let valid_actions = catalogue
        .iter()
        .map(|tool| tool.name.as_str())
        .chain(std::iter::once("final_answer"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a web research assistant. You help users extract and summarize information from websites by choosing one action at a time.

## Available Tools

{tool_descriptions}

## Decision Rules

1. To read a page, call **scraper** with the full URL.
2. To condense long content, call **summarize** with the text you already have.
3. Do not call the same tool twice with the same input. If an attempt failed, try something different or explain the failure.
4. As soon as the work log contains what the user asked for, give the final answer.

## Response Format

Reply with a single JSON object and nothing else (no markdown, no extra text):
{{"thought": "why this action", "action": "<tool name or final_answer>", "action_input": <arguments object, or the answer text>}}

Valid actions: {valid_actions}

Examples:
{{"thought": "I need the page content", "action": "scraper", "action_input": {{"url": "https://example.com"}}}}
{{"thought": "This is a simple question", "action": "final_answer", "action_input": "4"}}"#
    )
}

pub fn build_messages(request: &DecisionRequest<'_>) -> Vec<Message> {
    let mut messages = vec![
        Message::system(build_system_prompt(request.catalogue)),
        Message::user(request.instruction),
    ];

    if !request.scratchpad.is_empty() {
        messages.push(Message::user(format!(
            "Work log so far (learn from failures, do not repeat them):\n\n{}\nChoose the next action.",
            request.scratchpad.render()
        )));
    }

    messages
}
