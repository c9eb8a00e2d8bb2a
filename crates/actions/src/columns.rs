//! Carries input spreadsheet columns into output records unchanged.
//!
//! Step parameters go through reference resolution, so text containing `$`
//! is split into segments and every segment starting with `$` is escaped with
//! a second `$`. The handler joins the resolved segments back together.

use prospect_engine::{ActionHandler, ExecutionContext, Parameters};
use prospect_types::HandlerError;
use serde_json::{Value, json};

/// Parameters that make `input_column` output exactly `value`.
///
/// Arrays and objects are carried as their JSON text.
pub fn literal_parameters(value: &Value) -> Parameters {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
        scalar => return Parameters::from([("value".to_string(), scalar.clone())]),
    };
    if !text.contains('$') {
        return Parameters::from([("value".to_string(), Value::String(text))]);
    }
    let segments: Vec<String> = split_before_dollars(&text)
        .into_iter()
        .map(|segment| if segment.starts_with('$') { format!("${segment}") } else { segment.to_string() })
        .collect();
    Parameters::from([("segments".to_string(), json!(segments))])
}

fn split_before_dollars(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices('$') {
        if index > start {
            segments.push(&text[start..index]);
        }
        start = index;
    }
    segments.push(&text[start..]);
    segments
}

/// `input_column {value}` or `input_column {segments}`.
pub struct InputColumn;

impl ActionHandler for InputColumn {
    fn invoke(&self, parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
        if let Some(segments) = parameters.get("segments") {
            let segments = segments
                .as_array()
                .ok_or_else(|| HandlerError::permanent("parameter 'segments' must be a list of strings"))?;
            let mut text = String::new();
            for segment in segments {
                let segment = segment
                    .as_str()
                    .ok_or_else(|| HandlerError::permanent("parameter 'segments' must be a list of strings"))?;
                text.push_str(segment);
            }
            return Ok(Value::String(text));
        }
        parameters
            .get("value")
            .cloned()
            .ok_or_else(|| HandlerError::permanent("missing parameter 'value'"))
    }
}
