//! Strongly typed workflow definitions shared across the loader, engine, and CLI.
//!
//! Parameters and record fields use `IndexMap` so authoring order survives a
//! load/serialize round and output columns render in a predictable sequence.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::StepError;

pub mod validation;

/// Entity key used for steps that do not name one explicitly.
pub const DEFAULT_ENTITY: &str = "default";

/// Ordered list of steps loaded from a declarative document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkflowDescriptor {
    /// Optional workflow identifier used in logs and as the default entity key.
    #[serde(default)]
    pub workflow: Option<String>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDescriptor {
    /// Identifier used for telemetry, falling back to `"default"`.
    pub fn name(&self) -> &str {
        self.workflow
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ENTITY)
    }

    /// Looks up a step by name.
    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Entity key the given step contributes to.
    pub fn entity_of<'a>(&'a self, step: &'a StepDefinition) -> &'a str {
        step.entity.as_deref().unwrap_or_else(|| self.name())
    }
}

/// A single named unit of work bound to an action handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepDefinition {
    /// Unique, non-empty step name. Later steps reference its output as `$name`.
    pub name: String,
    /// Name of the registered action handler.
    pub action: String,
    /// Handler parameters; string values may reference earlier step outputs.
    #[serde(default)]
    pub parameters: IndexMap<String, JsonValue>,
    /// Entity (company, contact, ...) this step contributes a field to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Output column name; defaults to the step name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Earlier steps that must succeed even though no parameter references them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_dependency(mut self, step: impl Into<String>) -> Self {
        self.depends_on.push(step.into());
        self
    }

    /// Column name the step's output is recorded under.
    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

/// Terminal status of a step within one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Handler returned a value that was committed to the context.
    Success,
    /// Action unknown or handler failed after all attempts.
    Failed,
    /// Step never ran (missing dependency output, halted run, or cancellation).
    Skipped,
}

/// Outcome of a single step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    /// Step name.
    pub step: String,
    /// Action the step was bound to.
    pub action: String,
    pub status: StepStatus,
    /// Value returned by the handler on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonValue>,
    /// Failure detail, or the unresolved dependency for dependency skips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Handler invocations performed (0 when the step never ran).
    pub attempts: u32,
    /// Wall-clock time spent on the step, retries and backoff included.
    pub duration_ms: u64,
    /// Human-readable notes captured while processing the step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl StepResult {
    /// A step that never ran, with the reason recorded in its logs.
    pub fn skipped(step: &StepDefinition, note: impl Into<String>) -> Self {
        Self {
            step: step.name.clone(),
            action: step.action.clone(),
            status: StepStatus::Skipped,
            output: None,
            error: None,
            attempts: 0,
            duration_ms: 0,
            logs: vec![note.into()],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Overall outcome of a workflow run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step succeeded.
    Complete,
    /// The run halted, or finished with failed or skipped steps or sink errors.
    Incomplete,
    /// The run was cancelled between steps.
    Aborted,
}

/// Row of enriched fields collected for one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OutputRecord {
    /// Entity key (company, contact, or the workflow default).
    pub entity: String,
    /// Field name to value, in step order.
    pub fields: IndexMap<String, JsonValue>,
}

impl OutputRecord {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: IndexMap::new(),
        }
    }
}

/// Final report of a workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub workflow: String,
    pub status: RunStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// One entry per declared step, in declaration order.
    pub results: Vec<StepResult>,
    pub records_written: usize,
    /// Sink failures, in the order they occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Result recorded for the named step.
    pub fn result(&self, step: &str) -> Option<&StepResult> {
        self.results.iter().find(|result| result.step == step)
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}
