//! Accumulated step outputs for a single run.

use indexmap::IndexMap;
use prospect_types::StepReference;
use serde_json::Value;

/// Outputs of already-executed steps, keyed by step name.
///
/// The executor is the only writer: each key is committed at most once, after
/// the step succeeds. Handlers receive `&ExecutionContext` and can only read.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExecutionContext {
    outputs: IndexMap<String, Value>,
}

impl ExecutionContext {
    /// Output recorded for `step`, if it succeeded.
    pub fn get(&self, step: &str) -> Option<&Value> {
        self.outputs.get(step)
    }

    pub fn contains(&self, step: &str) -> bool {
        self.outputs.contains_key(step)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Step names and outputs in commit order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.outputs.iter().map(|(step, value)| (step.as_str(), value))
    }

    /// Resolves a reference, navigating into the output along its path.
    ///
    /// Returns `None` only when the step has no recorded output; a path that
    /// does not exist inside an existing output resolves to `null`.
    pub fn lookup(&self, reference: &StepReference) -> Option<Value> {
        let output = self.outputs.get(&reference.step)?;
        Some(navigate_json_path(output, &reference.path))
    }

    /// Snapshot of all outputs as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.outputs.iter().map(|(step, value)| (step.clone(), value.clone())).collect())
    }

    /// Records a step output. Returns `false` and leaves the existing value in
    /// place when the step already has one.
    pub(crate) fn commit(&mut self, step: &str, value: Value) -> bool {
        if self.outputs.contains_key(step) {
            return false;
        }
        self.outputs.insert(step.to_string(), value);
        true
    }
}

/// Navigates through a JSON value using field names and array indices.
fn navigate_json_path(value: &Value, path: &[String]) -> Value {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return Value::Null,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|index| items.get(index)) {
                Some(next) => next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current.clone()
}
