//! Structural validation applied to descriptors before any step runs.
//!
//! The checks run in declaration order and stop at the first violation:
//! - every step has a non-empty name and action;
//! - names are unique;
//! - parameter references and `depends_on` entries only name earlier steps,
//!   which rules out cycles by construction.

use std::collections::HashSet;

use super::WorkflowDescriptor;
use crate::{errors::DescriptorError, references::collect_step_references};

/// Validate a descriptor, returning the first violation found.
pub fn validate_descriptor(descriptor: &WorkflowDescriptor) -> Result<(), DescriptorError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, step) in descriptor.steps.iter().enumerate() {
        if step.name.trim().is_empty() {
            return Err(DescriptorError::malformed(format!("step #{} has an empty name", index + 1)));
        }
        if step.action.trim().is_empty() {
            return Err(DescriptorError::MissingAction(step.name.clone()));
        }
        if seen.contains(step.name.as_str()) {
            return Err(DescriptorError::DuplicateStepName(step.name.clone()));
        }

        for dependency in step_dependencies(step) {
            if !seen.contains(dependency.as_str()) {
                return Err(DescriptorError::forward_reference(&step.name, dependency));
            }
        }

        seen.insert(step.name.as_str());
    }

    Ok(())
}

/// Steps whose outputs must exist before `step` can run: parameter references
/// followed by explicit `depends_on` entries, without duplicates.
pub fn step_dependencies(step: &super::StepDefinition) -> Vec<String> {
    let mut dependencies: Vec<String> = Vec::new();
    let referenced = step.parameters.values().flat_map(collect_step_references);
    for name in referenced.chain(step.depends_on.iter().cloned()) {
        if !dependencies.contains(&name) {
            dependencies.push(name);
        }
    }
    dependencies
}
