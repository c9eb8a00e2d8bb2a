//! Workflow descriptor loading.
//!
//! Documents are JSON or YAML in one of two shapes:
//!
//! ```yaml
//! # bare step list
//! - name: lookup
//!   action: revenue_lookup
//!   parameters: { company: Acme }
//! ```
//!
//! ```yaml
//! # named workflow
//! workflow: companies
//! steps:
//!   - name: lookup
//!     action: revenue_lookup
//! ```
//!
//! Loading is all-or-nothing: any violation returns a [`DescriptorError`]
//! and no descriptor is produced.

use std::{fs, path::Path};

use prospect_types::{
    DescriptorError, StepDefinition, WorkflowDescriptor,
    workflow::validation::validate_descriptor,
};
use serde_json::Value;
use tracing::debug;

/// Parses and validates a descriptor from document text.
pub fn load(source: &str) -> Result<WorkflowDescriptor, DescriptorError> {
    let document = parse_document(source)?;
    let descriptor = descriptor_from_document(document)?;
    validate_descriptor(&descriptor)?;
    debug!(workflow = %descriptor.name(), steps = descriptor.steps.len(), "loaded workflow descriptor");
    Ok(descriptor)
}

/// Reads a descriptor file and loads it with [`load`].
pub fn load_file(path: impl AsRef<Path>) -> Result<WorkflowDescriptor, DescriptorError> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = String::from_utf8(content)
        .map_err(|error| DescriptorError::malformed(format!("descriptor is not valid UTF-8: {error}")))?;
    load(&source)
}

fn parse_document(source: &str) -> Result<Value, DescriptorError> {
    if source.trim().is_empty() {
        return Err(DescriptorError::malformed("document is empty"));
    }
    if let Ok(value) = serde_json::from_str::<Value>(source) {
        return Ok(value);
    }
    serde_yaml::from_str::<Value>(source).map_err(|error| DescriptorError::malformed(format!("not valid JSON or YAML: {error}")))
}

fn descriptor_from_document(document: Value) -> Result<WorkflowDescriptor, DescriptorError> {
    let (workflow, raw_steps) = match document {
        Value::Array(steps) => (None, steps),
        Value::Object(mut object) => {
            let workflow = match object.remove("workflow") {
                None | Some(Value::Null) => None,
                Some(Value::String(name)) => Some(name),
                Some(other) => return Err(DescriptorError::malformed(format!("'workflow' must be a string, got {other}"))),
            };
            match object.remove("steps") {
                Some(Value::Array(steps)) => (workflow, steps),
                Some(_) => return Err(DescriptorError::malformed("'steps' must be a list")),
                None => return Err(DescriptorError::malformed("expected a list of steps or an object with 'steps'")),
            }
        }
        _ => return Err(DescriptorError::malformed("expected a list of steps or an object with 'steps'")),
    };

    let steps = raw_steps
        .into_iter()
        .enumerate()
        .map(|(index, raw)| step_from_value(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(WorkflowDescriptor { workflow, steps })
}

fn step_from_value(index: usize, raw: Value) -> Result<StepDefinition, DescriptorError> {
    let position = index + 1;
    let Value::Object(object) = &raw else {
        return Err(DescriptorError::malformed(format!("step #{position} must be an object")));
    };

    let name = match object.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(DescriptorError::malformed(format!("step #{position} is missing a name")));
        }
        Some(other) => return Err(DescriptorError::malformed(format!("step #{position} name must be a string, got {other}"))),
    };

    match object.get("action") {
        Some(Value::String(action)) if !action.trim().is_empty() => {}
        Some(Value::String(_)) | None | Some(Value::Null) => return Err(DescriptorError::MissingAction(name)),
        Some(other) => {
            return Err(DescriptorError::malformed(format!("step '{name}' action must be a string, got {other}")));
        }
    }

    if matches!(object.get("parameters"), Some(Value::Null)) {
        let mut object = object.clone();
        object.remove("parameters");
        return serde_json::from_value(Value::Object(object)).map_err(|error| DescriptorError::malformed(format!("step '{name}': {error}")));
    }

    serde_json::from_value(raw.clone()).map_err(|error| DescriptorError::malformed(format!("step '{name}': {error}")))
}
