//! Parameter references to earlier step outputs.
//!
//! Two forms are recognized inside string parameter values:
//!
//! - `$step` or `$step.path.0.field` as the whole value, replaced by the
//!   referenced output (or the nested value at the path) with its JSON type
//!   preserved.
//! - `${{ steps.step.path }}` embedded anywhere in a string, interpolated as
//!   text.
//!
//! A whole-value reference must start with a letter or underscore after the
//! `$`, so amounts such as `"$5 million"` stay literal. A leading `$$` escapes
//! a literal dollar sign and is never a reference.

use serde_json::Value;

const TEMPLATE_OPEN: &str = "${{";
const TEMPLATE_CLOSE: &str = "}}";

/// A reference to a step output, optionally narrowed by a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReference {
    pub step: String,
    pub path: Vec<String>,
}

impl StepReference {
    fn from_dotted(dotted: &str) -> Option<Self> {
        let mut segments = dotted.split('.').map(str::trim);
        let step = segments.next().filter(|segment| !segment.is_empty())?;
        let path: Vec<String> = segments.map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return None;
        }
        Some(Self {
            step: step.to_string(),
            path,
        })
    }
}

/// Parses a whole-value reference (`$step[.path]`).
///
/// Returns `None` for plain strings, escaped `$$` strings, and embedded
/// `${{ ... }}` templates.
pub fn parse_reference(text: &str) -> Option<StepReference> {
    let rest = text.strip_prefix('$')?;
    let first = rest.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    StepReference::from_dotted(rest)
}

/// Iterates `${{ steps.<step>[.path] }}` templates embedded in a string.
///
/// Yields `(start, end, reference)` byte spans; expressions that are not step
/// references (or lack a closing `}}`) are ignored.
pub fn template_references(text: &str) -> Vec<(usize, usize, StepReference)> {
    let mut found = Vec::new();
    let mut offset = 0usize;
    while let Some(open) = text[offset..].find(TEMPLATE_OPEN) {
        let start = offset + open;
        let body_start = start + TEMPLATE_OPEN.len();
        let Some(close) = text[body_start..].find(TEMPLATE_CLOSE) else {
            break;
        };
        let end = body_start + close + TEMPLATE_CLOSE.len();
        let expression = text[body_start..body_start + close].trim();
        if let Some(reference) = expression.strip_prefix("steps.").and_then(StepReference::from_dotted) {
            found.push((start, end, reference));
        }
        offset = end;
    }
    found
}

/// Collects every step name referenced anywhere inside a parameter value.
///
/// Names are returned in first-seen order without duplicates.
pub fn collect_step_references(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_into(value, &mut names);
    names
}

fn collect_into(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            if text.starts_with("$$") {
                return;
            }
            if let Some(reference) = parse_reference(text) {
                push_unique(names, reference.step);
                return;
            }
            for (_, _, reference) in template_references(text) {
                push_unique(names, reference.step);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_into(item, names)),
        Value::Object(map) => map.values().for_each(|item| collect_into(item, names)),
        _ => {}
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
