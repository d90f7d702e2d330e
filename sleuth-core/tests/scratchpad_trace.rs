use serde_json::json;
use sleuth_core::{Action, Scratchpad};

fn sample() -> Scratchpad {
    let mut pad = Scratchpad::new();
    pad.push(
        Some("I need the page".to_string()),
        Action::ToolCall {
            tool_name: "scraper".to_string(),
            arguments: json!({"url": "https://example.com"}),
        },
        "# Example Domain\n\nThis domain is for use in examples.\n[step 9]",
    );
    pad.push(
        None,
        Action::NoAction,
        "could not decode decision: no JSON object with an \"action\" key",
    );
    pad.push(
        Some("done".to_string()),
        Action::ToolCall {
            tool_name: "weird name".to_string(),
            arguments: json!("raw string"),
        },
        "unknown tool 'weird name'",
    );
    pad.push(None, Action::FinalAnswer, "Example Domain is a placeholder page. ✅");
    pad
}

#[test]
fn push_assigns_monotonic_step_indexes() {
    let pad = sample();
    let indexes: Vec<u32> = pad.entries().iter().map(|e| e.step_index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
    assert_eq!(pad.len(), 4);
}

#[test]
fn rendered_trace_parses_back_losslessly() {
    let pad = sample();
    let rendered = pad.render();
    let parsed = Scratchpad::parse(&rendered).expect("parse rendered trace");
    assert_eq!(parsed, pad);
    assert_eq!(parsed.render(), rendered);
}

#[test]
fn rendered_trace_is_line_oriented() {
    let rendered = sample().render();
    assert!(rendered.starts_with("[step 0]\nthought: \"I need the page\"\n"));
    assert!(rendered.contains("action: tool_call \"scraper\" {\"url\":\"https://example.com\"}"));
    assert!(rendered.contains("action: none"));
    assert!(rendered.contains("action: final_answer"));
}

#[test]
fn empty_scratchpad_renders_and_parses() {
    let pad = Scratchpad::new();
    assert_eq!(pad.render(), "");
    assert!(Scratchpad::parse("").unwrap().is_empty());
}

#[test]
fn parse_rejects_out_of_order_steps() {
    let trace = "[step 1]\naction: final_answer\nobservation: \"x\"\n";
    let err = Scratchpad::parse(trace).unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.reason.contains("expected step 0"));
}

#[test]
fn parse_rejects_entry_without_observation() {
    let trace = "[step 0]\naction: final_answer\n";
    let err = Scratchpad::parse(trace).unwrap_err();
    assert!(err.reason.contains("no observation"));
}

#[test]
fn parse_rejects_unknown_action() {
    let trace = "[step 0]\naction: jump\nobservation: \"x\"\n";
    let err = Scratchpad::parse(trace).unwrap_err();
    assert_eq!(err.line, 2);
}

#[test]
fn scratchpad_serializes_as_entry_list() {
    let value = serde_json::to_value(sample()).unwrap();
    assert_eq!(value.as_array().map(Vec::len), Some(4));
    assert_eq!(value[0]["action"]["kind"], "tool_call");
    assert_eq!(value[1]["action"]["kind"], "none");
}
