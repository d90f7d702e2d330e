//! Append-only audit trail of one agent run.
//!
//! The rendered trace is line oriented. Every free-text field is written as a
//! JSON string literal, so a rendered trace always parses back into the same
//! entries:
//!
//! ```text
//! [step 0]
//! thought: "I need the page content"
//! action: tool_call "scraper" {"url":"https://example.com"}
//! observation: "# Example Domain\nThis domain is for use in examples."
//! ```

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Value;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    ToolCall { tool_name: String, arguments: Value },
    FinalAnswer,
    /// The step produced no usable decision (decode failure, decision timeout).
    #[serde(rename = "none")]
    NoAction,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ToolCall {
                tool_name,
                arguments,
            } => {
                let name = serde_json::to_string(tool_name).map_err(|_| fmt::Error)?;
                write!(f, "tool_call {name} {arguments}")
            }
            Action::FinalAnswer => f.write_str("final_answer"),
            Action::NoAction => f.write_str("none"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ScratchpadEntry {
    pub step_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    pub action: Action,
    pub observation: String,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next entry. The step index is assigned here so entries stay
    /// strictly ordered.
    pub fn push(
        &mut self,
        thought: Option<String>,
        action: Action,
        observation: impl Into<String>,
    ) -> &ScratchpadEntry {
        let step_index = self.entries.len() as u32;
        self.entries.push(ScratchpadEntry {
            step_index,
            thought,
            action,
            observation: observation.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ScratchpadEntry> {
        self.entries.last()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (position, entry) in self.entries.iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            render_entry(&mut out, entry);
        }
        out
    }

    pub fn parse(trace: &str) -> Result<Self, TraceParseError> {
        let mut entries: Vec<ScratchpadEntry> = Vec::new();
        let mut current: Option<PartialEntry> = None;
        let mut last_line = 0;

        for (number, line) in trace.lines().enumerate() {
            let line_no = number + 1;
            last_line = line_no;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(index) = line
                .strip_prefix("[step ")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                if let Some(partial) = current.take() {
                    entries.push(partial.finish(line_no)?);
                }
                let step_index = index
                    .parse::<u32>()
                    .map_err(|err| {
                        TraceParseError::new(line_no, format!("bad step index: {err}"))
                    })?;
                if step_index as usize != entries.len() {
                    return Err(TraceParseError::new(
                        line_no,
                        format!("expected step {}, found step {step_index}", entries.len()),
                    ));
                }
                current = Some(PartialEntry::new(step_index));
                continue;
            }

            let partial = current
                .as_mut()
                .ok_or_else(|| TraceParseError::new(line_no, "field before any step header"))?;
            let (key, raw) = line
                .split_once(": ")
                .ok_or_else(|| TraceParseError::new(line_no, "expected `key: value`"))?;
            match key {
                "thought" => {
                    let thought = decode_text(line_no, raw)?;
                    set_once(&mut partial.thought, thought, line_no, key)?;
                }
                "action" => {
                    let action = parse_action(line_no, raw)?;
                    set_once(&mut partial.action, action, line_no, key)?;
                }
                "observation" => {
                    let observation = decode_text(line_no, raw)?;
                    set_once(&mut partial.observation, observation, line_no, key)?;
                }
                other => {
                    return Err(TraceParseError::new(
                        line_no,
                        format!("unknown field `{other}`"),
                    ))
                }
            }
        }

        if let Some(partial) = current.take() {
            entries.push(partial.finish(last_line)?);
        }

        Ok(Self { entries })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid scratchpad trace at line {line}: {reason}")]
pub struct TraceParseError {
    pub line: usize,
    pub reason: String,
}

impl TraceParseError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

fn render_entry(out: &mut String, entry: &ScratchpadEntry) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "[step {}]", entry.step_index);
    if let Some(thought) = &entry.thought {
        let _ = writeln!(out, "thought: {}", encode_text(thought));
    }
    let _ = writeln!(out, "action: {}", entry.action);
    let _ = writeln!(out, "observation: {}", encode_text(&entry.observation));
}

fn encode_text(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

fn decode_text(line: usize, raw: &str) -> Result<String, TraceParseError> {
    serde_json::from_str::<String>(raw)
        .map_err(|err| TraceParseError::new(line, format!("bad string literal: {err}")))
}

fn parse_action(line: usize, raw: &str) -> Result<Action, TraceParseError> {
    match raw {
        "final_answer" => return Ok(Action::FinalAnswer),
        "none" => return Ok(Action::NoAction),
        _ => {}
    }

    let rest = raw
        .strip_prefix("tool_call ")
        .ok_or_else(|| TraceParseError::new(line, format!("unknown action `{raw}`")))?;
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    let tool_name = match values.next() {
        Some(Ok(Value::String(name))) => name,
        _ => return Err(TraceParseError::new(line, "tool_call without a quoted tool name")),
    };
    let arguments = match values.next() {
        Some(Ok(arguments)) => arguments,
        _ => return Err(TraceParseError::new(line, "tool_call without arguments")),
    };
    if values.next().is_some() {
        return Err(TraceParseError::new(line, "trailing data after tool_call arguments"));
    }

    Ok(Action::ToolCall {
        tool_name,
        arguments,
    })
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    line: usize,
    key: &str,
) -> Result<(), TraceParseError> {
    if slot.is_some() {
        return Err(TraceParseError::new(line, format!("duplicate `{key}`")));
    }
    *slot = Some(value);
    Ok(())
}

struct PartialEntry {
    step_index: u32,
    thought: Option<String>,
    action: Option<Action>,
    observation: Option<String>,
}

impl PartialEntry {
    fn new(step_index: u32) -> Self {
        Self {
            step_index,
            thought: None,
            action: None,
            observation: None,
        }
    }

    fn finish(self, line: usize) -> Result<ScratchpadEntry, TraceParseError> {
        let action = self.action.ok_or_else(|| {
            TraceParseError::new(line, format!("step {} has no action", self.step_index))
        })?;
        let observation = self.observation.ok_or_else(|| {
            TraceParseError::new(line, format!("step {} has no observation", self.step_index))
        })?;
        Ok(ScratchpadEntry {
            step_index: self.step_index,
            thought: self.thought,
            action,
            observation,
        })
    }
}
