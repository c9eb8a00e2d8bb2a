//! Execution engine: runs the steps of a loaded workflow in declaration order,
//! records one result per step, and emits per-entity records as they complete.
//!
//! - `registry::ActionRegistry` maps action names to handlers
//! - `step_once` invokes a handler with bounded retries
//! - `records` groups step outputs into entity records
//! - `sink::OutputSink` receives records incrementally
//! - `control::RunControl` carries cooperative cancellation
//!
//! For each step the executor:
//! 1. stops if cancellation was requested (the rest of the run is skipped),
//! 2. fails the step when its action has no handler,
//! 3. skips the step when a referenced step has no recorded output,
//! 4. resolves parameters and invokes the handler, retrying transient errors,
//! 5. commits the output on success and applies the failure policy otherwise.

use std::time::Instant;

use chrono::Utc;
use prospect_types::{
    ExecutorConfig, FailurePolicy, RunStatus, RunSummary, StepDefinition, StepError, StepResult, StepStatus,
    WorkflowDescriptor, workflow::validation::step_dependencies,
};
use tracing::{debug, info, warn};

use crate::{context::ExecutionContext, resolve::resolve_parameters};

pub mod control;
mod records;
pub mod registry;
pub mod sink;
mod step_once;

pub use control::RunControl;
pub use registry::{ActionHandler, ActionRegistry, Parameters, optional_str, required_str};
pub use sink::{JsonLinesSink, MemorySink, OutputSink};

use records::RecordPlan;
use step_once::invoke_with_retry;

/// Why the remaining steps of a run are not executed.
#[derive(Debug, Clone)]
enum Stop {
    Halted { step: String },
    WriteFailed { entity: String },
    Cancelled,
}

impl Stop {
    fn note(&self, step: &str) -> String {
        match self {
            Self::Halted { step: failed } => format!("step '{step}' skipped: run halted after '{failed}' failed"),
            Self::WriteFailed { entity } => format!("step '{step}' skipped: run halted after writing '{entity}' failed"),
            Self::Cancelled => format!("step '{step}' skipped: run cancelled"),
        }
    }
}

/// Runs `descriptor` and returns the summary.
pub fn execute(
    descriptor: &WorkflowDescriptor,
    registry: &ActionRegistry,
    sink: &mut dyn OutputSink,
    config: &ExecutorConfig,
    control: &RunControl,
) -> RunSummary {
    execute_with_context(descriptor, registry, sink, config, control).0
}

/// Runs `descriptor` and returns the summary along with the final context.
pub fn execute_with_context(
    descriptor: &WorkflowDescriptor,
    registry: &ActionRegistry,
    sink: &mut dyn OutputSink,
    config: &ExecutorConfig,
    control: &RunControl,
) -> (RunSummary, ExecutionContext) {
    let started_at = Utc::now();
    let workflow = descriptor.name().to_string();
    info!(
        workflow = %workflow,
        steps = descriptor.steps.len(),
        policy = ?config.failure_policy,
        max_attempts = config.max_attempts,
        "workflow run started"
    );

    let mut context = ExecutionContext::default();
    let mut plan = RecordPlan::new(descriptor);
    let mut results = Vec::with_capacity(descriptor.steps.len());
    let mut records_written = 0usize;
    let mut write_errors = Vec::new();
    let mut stop: Option<Stop> = None;

    for (index, step) in descriptor.steps.iter().enumerate() {
        if stop.is_none() && control.is_cancelled() {
            info!(workflow = %workflow, before = %step.name, "cancellation requested; stopping run");
            stop = Some(Stop::Cancelled);
        }
        if let Some(reason) = &stop {
            debug!(step = %step.name, "step not executed");
            results.push(StepResult::skipped(step, reason.note(&step.name)));
            continue;
        }

        let result = run_step(step, registry, &context, config);
        if let Some(output) = &result.output
            && result.status == StepStatus::Success
            && !context.commit(&step.name, output.clone())
        {
            warn!(step = %step.name, "output already recorded; keeping the first value");
        }

        let halts = result.status == StepStatus::Failed && config.failure_policy == FailurePolicy::HaltOnFailure;
        results.push(result);

        let entity = if halts {
            warn!(workflow = %workflow, step = %step.name, "halting run after step failure");
            stop = Some(Stop::Halted { step: step.name.clone() });
            Some(descriptor.entity_of(step).to_string())
        } else {
            plan.closes_at(index).map(str::to_string)
        };

        let Some(entity) = entity else { continue };
        let Some(record) = plan.take(descriptor, &entity, &context) else { continue };
        match sink.write(&record) {
            Ok(()) => {
                records_written += 1;
                info!(entity = %entity, fields = record.fields.len(), "record written");
            }
            Err(error) => {
                warn!(entity = %entity, error = %error, "failed to write record");
                write_errors.push(error.to_string());
                if config.halt_on_write_error && stop.is_none() {
                    stop = Some(Stop::WriteFailed { entity });
                }
            }
        }
    }

    let succeeded = count(&results, StepStatus::Success);
    let failed = count(&results, StepStatus::Failed);
    let skipped = count(&results, StepStatus::Skipped);
    let status = match stop {
        Some(Stop::Cancelled) => RunStatus::Aborted,
        Some(_) => RunStatus::Incomplete,
        None if failed > 0 || skipped > 0 || !write_errors.is_empty() => RunStatus::Incomplete,
        None => RunStatus::Complete,
    };

    info!(
        workflow = %workflow,
        status = ?status,
        succeeded,
        failed,
        skipped,
        records_written,
        "workflow run finished"
    );

    let summary = RunSummary {
        workflow,
        status,
        total: results.len(),
        succeeded,
        failed,
        skipped,
        results,
        records_written,
        write_errors,
        started_at,
        finished_at: Utc::now(),
    };
    (summary, context)
}

/// Processes one step against the current context.
fn run_step(step: &StepDefinition, registry: &ActionRegistry, context: &ExecutionContext, config: &ExecutorConfig) -> StepResult {
    let started = Instant::now();
    let mut result = StepResult {
        step: step.name.clone(),
        action: step.action.clone(),
        status: StepStatus::Failed,
        output: None,
        error: None,
        attempts: 0,
        duration_ms: 0,
        logs: Vec::new(),
    };

    let Some(handler) = registry.get(&step.action) else {
        warn!(step = %step.name, action = %step.action, "no handler registered for action");
        let error = StepError::unknown_action(&step.action);
        result.logs.push(format!("step '{}' failed: {error}", step.name));
        result.error = Some(error);
        return result;
    };

    if let Some(missing) = step_dependencies(step)
        .into_iter()
        .find(|dependency| !context.contains(dependency))
    {
        info!(step = %step.name, dependency = %missing, "dependency has no output; skipping step");
        result.status = StepStatus::Skipped;
        result
            .logs
            .push(format!("step '{}' skipped: dependency '{missing}' has no recorded output", step.name));
        result.error = Some(StepError::unresolved_dependency(missing));
        return result;
    }

    let parameters = match resolve_parameters(&step.parameters, context) {
        Ok(parameters) => parameters,
        Err(error) => {
            result.status = StepStatus::Skipped;
            result.logs.push(format!("step '{}' skipped: {error}", step.name));
            result.error = Some(error);
            return result;
        }
    };

    debug!(step = %step.name, action = %step.action, "dispatching step");
    let invocation = invoke_with_retry(
        &step.name,
        handler.as_ref(),
        &parameters,
        context,
        config.max_attempts,
        config.retry_backoff,
    );
    result.attempts = invocation.attempts;
    match invocation.outcome {
        Ok(output) => {
            result.status = StepStatus::Success;
            result.output = Some(output);
            result.logs.push(format!("step '{}' executed", step.name));
            info!(step = %step.name, attempts = result.attempts, "step succeeded");
        }
        Err(error) => {
            result.logs.push(format!("step '{}' failed: {error}", step.name));
            warn!(step = %step.name, attempts = result.attempts, error = %error, "step failed");
            result.error = Some(StepError::from(error));
        }
    }
    result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    result
}

fn count(results: &[StepResult], status: StepStatus) -> usize {
    results.iter().filter(|result| result.status == status).count()
}
