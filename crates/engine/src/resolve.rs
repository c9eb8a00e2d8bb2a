//! # Parameter Resolution
//!
//! Substitutes references to earlier step outputs inside step parameters
//! before a handler is invoked.
//!
//! - `"$lookup"` becomes the output of step `lookup`, keeping its JSON type.
//! - `"$profile.url"` becomes the `url` field of step `profile`'s output.
//! - `"${{ steps.first.name }}.${{ steps.last }}"` is interpolated as text.
//! - `"$$5"` is the literal string `"$5"`.
//!
//! Arrays and objects are resolved recursively; other values pass through.
//!
//! ```rust
//! use indexmap::indexmap;
//! use prospect_engine::{ExecutionContext, resolve::resolve_parameters};
//! use serde_json::json;
//!
//! let parameters = indexmap! { "company".to_string() => json!("Acme") };
//! let resolved = resolve_parameters(&parameters, &ExecutionContext::default()).expect("no references");
//! assert_eq!(resolved["company"], "Acme");
//! ```

use indexmap::IndexMap;
use prospect_types::{StepError, parse_reference, references::template_references};
use serde_json::Value;

use crate::context::ExecutionContext;

/// Resolves every parameter against the context.
///
/// Fails with [`StepError::UnresolvedDependency`] naming the first referenced
/// step that has no recorded output.
pub fn resolve_parameters(parameters: &IndexMap<String, Value>, context: &ExecutionContext) -> Result<IndexMap<String, Value>, StepError> {
    parameters
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve_value(value, context)?)))
        .collect()
}

/// Resolves references within a single JSON value.
pub fn resolve_value(value: &Value, context: &ExecutionContext) -> Result<Value, StepError> {
    match value {
        Value::String(text) => resolve_string(text, context),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(item, context)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(text: &str, context: &ExecutionContext) -> Result<Value, StepError> {
    if let Some(escaped) = text.strip_prefix("$$") {
        return Ok(Value::String(format!("${escaped}")));
    }
    if let Some(reference) = parse_reference(text) {
        return context
            .lookup(&reference)
            .ok_or_else(|| StepError::unresolved_dependency(&reference.step));
    }

    let spans = template_references(text);
    if spans.is_empty() {
        return Ok(Value::String(text.to_string()));
    }

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for (start, end, reference) in spans {
        output.push_str(&text[cursor..start]);
        let value = context
            .lookup(&reference)
            .ok_or_else(|| StepError::unresolved_dependency(&reference.step))?;
        output.push_str(&format_json_value(&value));
        cursor = end;
    }
    output.push_str(&text[cursor..]);
    Ok(Value::String(output))
}

/// Renders a JSON value for embedding in text: strings unquoted, null empty.
fn format_json_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
