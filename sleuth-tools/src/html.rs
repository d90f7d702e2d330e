//! Semantic text extraction from HTML.
//!
//! Boilerplate containers are dropped, headings become `#` lines, list items
//! become bullets and every other block yields one line of collapsed text.

use scraper::{ElementRef, Html, Node};

const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "nav", "header", "footer", "aside", "head",
    "template", "meta", "link",
];

/// Elements that start a new line. Anything else is treated as inline text.
const BLOCKS: &[&str] = &[
    "address", "article", "blockquote", "body", "caption", "dd", "details", "dialog", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "li", "main", "ol", "p", "pre", "section", "summary", "table", "tbody", "thead", "tfoot", "tr",
    "ul",
];

/// Inline elements whose neighbours must not run together.
const SEPARATED: &[&str] = &["td", "th", "br", "label", "option", "button", "img"];

pub fn looks_like_html(content: &str) -> bool {
    let start: String = content.trim_start().chars().take(200).collect();
    let start = start.to_ascii_lowercase();
    ["<!doctype", "<html", "<head", "<body", "<div", "<p>"]
        .iter()
        .any(|marker| start.contains(marker))
}

pub fn extract_semantic_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut lines = Vec::new();

    if let Some(title) = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "title")
    {
        let title = visible_text(title);
        if !title.is_empty() {
            lines.push(format!("Title: {title}"));
        }
    }

    walk(root, &mut lines);
    lines.dedup();
    lines.join("\n")
}

/// Collapses every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn walk(element: ElementRef<'_>, lines: &mut Vec<String>) {
    let mut inline = String::new();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => inline.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                if BLOCKS.contains(&name) {
                    flush(&mut inline, lines);
                    emit_block(child, lines);
                } else {
                    collect_text(child, &mut inline);
                    if SEPARATED.contains(&name) {
                        inline.push(' ');
                    }
                }
            }
            _ => {}
        }
    }

    flush(&mut inline, lines);
}

fn emit_block(element: ElementRef<'_>, lines: &mut Vec<String>) {
    let name = element.value().name();
    let line = match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = visible_text(element);
            (!text.is_empty()).then(|| format!("{} {text}", "#".repeat(level)))
        }
        "li" => {
            let text = visible_text(element);
            (!text.is_empty()).then(|| format!("• {text}"))
        }
        "p" | "pre" | "blockquote" | "dt" | "dd" | "figcaption" | "caption" | "summary" => {
            let text = visible_text(element);
            (!text.is_empty()).then_some(text)
        }
        "hr" => None,
        _ => {
            walk(element, lines);
            None
        }
    };

    if let Some(line) = line {
        lines.push(line);
    }
}

fn flush(inline: &mut String, lines: &mut Vec<String>) {
    let text = collapse_whitespace(inline);
    if !text.is_empty() {
        lines.push(text);
    }
    inline.clear();
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                collect_text(child, out);
                if SEPARATED.contains(&name) || BLOCKS.contains(&name) {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    collapse_whitespace(&text)
}
