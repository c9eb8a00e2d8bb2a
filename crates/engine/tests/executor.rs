use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use prospect_engine::{
    ActionRegistry, ExecutionContext, MemorySink, OutputSink, Parameters, RunControl, execute, execute_with_context, load,
};
use prospect_types::{
    DescriptorError, ExecutorConfig, FailurePolicy, HandlerError, OutputRecord, RunStatus, StepError, StepStatus, WriteError,
};
use serde_json::{Value, json};

fn config(policy: FailurePolicy) -> ExecutorConfig {
    ExecutorConfig {
        failure_policy: policy,
        max_attempts: 3,
        retry_backoff: Duration::ZERO,
        halt_on_write_error: false,
    }
}

fn lookup_and_tier_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry
        .register("lookup", |_: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> { Ok(json!(1_000_000)) })
        .register("tier", |parameters: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> {
            let value = parameters.get("value").and_then(Value::as_f64).unwrap_or_default();
            Ok(json!(if value >= 1_000_000.0 { "Tier2" } else { "Tier1" }))
        })
        .register("fail", |_: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> {
            Err(HandlerError::permanent("lookup service rejected the request"))
        })
        .register("ok", |_: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> { Ok(json!("ok")) });
    registry
}

#[test]
fn lookup_then_tier_produces_one_record() {
    let descriptor = load(
        r#"[
            {"name": "lookup", "action": "lookup", "parameters": {"company": "Acme"}},
            {"name": "tier", "action": "tier", "parameters": {"value": "$lookup"}}
        ]"#,
    )
    .expect("load");
    let mut sink = MemorySink::new();

    let (summary, context) = execute_with_context(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut sink,
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.status, RunStatus::Complete);
    assert_eq!((summary.total, summary.succeeded, summary.failed, summary.skipped), (2, 2, 0, 0));
    assert_eq!(context.to_value(), json!({"lookup": 1_000_000, "tier": "Tier2"}));
    assert_eq!(summary.records_written, 1);
    assert_eq!(sink.records().len(), 1);
    assert_eq!(sink.records()[0].fields.get("lookup"), Some(&json!(1_000_000)));
    assert_eq!(sink.records()[0].fields.get("tier"), Some(&json!("Tier2")));
}

#[test]
fn every_result_is_reported_in_declaration_order() {
    let descriptor = load(
        r#"[
            {"name": "c", "action": "ok"},
            {"name": "a", "action": "ok"},
            {"name": "b", "action": "ok"}
        ]"#,
    )
    .expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );
    let order: Vec<&str> = summary.results.iter().map(|result| result.step.as_str()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
    assert!(summary.is_complete());
    assert!(summary.started_at <= summary.finished_at);
}

#[test]
fn halt_on_failure_skips_the_rest() {
    let descriptor = load(
        r#"[
            {"name": "a", "action": "fail"},
            {"name": "b", "action": "ok"}
        ]"#,
    )
    .expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.status, RunStatus::Incomplete);
    let a = summary.result("a").expect("a");
    assert_eq!(a.status, StepStatus::Failed);
    assert!(matches!(a.error, Some(StepError::HandlerError { retryable: false, .. })));
    let b = summary.result("b").expect("b");
    assert_eq!(b.status, StepStatus::Skipped);
    assert_eq!(b.attempts, 0);
    assert!(b.logs.iter().any(|log| log.contains("halted")));
    assert_eq!((summary.total, summary.failed, summary.skipped), (2, 1, 1));
}

#[test]
fn continue_on_failure_runs_independent_steps() {
    let descriptor = load(
        r#"[
            {"name": "a", "action": "fail"},
            {"name": "b", "action": "ok"}
        ]"#,
    )
    .expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::ContinueOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.result("a").expect("a").status, StepStatus::Failed);
    assert_eq!(summary.result("b").expect("b").status, StepStatus::Success);
    assert_eq!(summary.status, RunStatus::Incomplete);
}

#[test]
fn escaped_templates_do_not_create_dependencies() {
    let descriptor = load(
        r#"[
            {"name": "a", "action": "fail"},
            {"name": "b", "action": "ok", "parameters": {"p": "$${{ steps.a }}"}},
            {"name": "c", "action": "ok", "parameters": {"p": "$${{ steps.later }}"}}
        ]"#,
    )
    .expect("escaped templates load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::ContinueOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.result("b").expect("b").status, StepStatus::Success);
    assert_eq!(summary.result("c").expect("c").status, StepStatus::Success);
}

#[test]
fn dependents_of_failed_steps_are_skipped_under_continue() {
    let descriptor = load(
        r#"[
            {"name": "lookup", "action": "fail"},
            {"name": "tier", "action": "tier", "parameters": {"value": "$lookup"}},
            {"name": "after", "action": "ok", "depends_on": ["tier"]},
            {"name": "other", "action": "ok"}
        ]"#,
    )
    .expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::ContinueOnFailure),
        &RunControl::new(),
    );

    let tier = summary.result("tier").expect("tier");
    assert_eq!(tier.status, StepStatus::Skipped);
    assert_eq!(tier.error, Some(StepError::unresolved_dependency("lookup")));
    let after = summary.result("after").expect("after");
    assert_eq!(after.error, Some(StepError::unresolved_dependency("tier")));
    assert_eq!(summary.result("other").expect("other").status, StepStatus::Success);
    assert_eq!((summary.succeeded, summary.failed, summary.skipped), (1, 1, 2));
}

#[test]
fn unknown_action_fails_the_step() {
    let descriptor = load(r#"[{"name": "a", "action": "does_not_exist"}, {"name": "b", "action": "ok"}]"#).expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );
    let a = summary.result("a").expect("a");
    assert_eq!(a.status, StepStatus::Failed);
    assert_eq!(a.error, Some(StepError::unknown_action("does_not_exist")));
    assert_eq!(a.attempts, 0);
    assert_eq!(summary.result("b").expect("b").status, StepStatus::Skipped);
}

fn flaky_registry(failures: u32, calls: Arc<AtomicU32>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register("flaky", move |_: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= failures {
            Err(HandlerError::transient("upstream timed out"))
        } else {
            Ok(json!({"call": call}))
        }
    });
    registry
}

#[test]
fn transient_failures_below_the_limit_succeed() {
    let descriptor = load(r#"[{"name": "s", "action": "flaky"}]"#).expect("load");
    let calls = Arc::new(AtomicU32::new(0));
    let registry = flaky_registry(2, calls.clone());

    let summary = execute(
        &descriptor,
        &registry,
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );

    let result = summary.result("s").expect("s");
    assert_eq!(result.status, StepStatus::Success);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.output, Some(json!({"call": 3})));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn transient_failures_at_the_limit_fail() {
    let descriptor = load(r#"[{"name": "s", "action": "flaky"}]"#).expect("load");
    let calls = Arc::new(AtomicU32::new(0));
    let registry = flaky_registry(3, calls.clone());

    let summary = execute(
        &descriptor,
        &registry,
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );

    let result = summary.result("s").expect("s");
    assert_eq!(result.status, StepStatus::Failed);
    assert_eq!(result.attempts, 3);
    assert!(matches!(result.error, Some(StepError::HandlerError { retryable: true, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn cancellation_before_start_aborts_everything() {
    let descriptor = load(r#"[{"name": "a", "action": "ok"}, {"name": "b", "action": "ok"}]"#).expect("load");
    let control = RunControl::new();
    control.cancel();
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &control,
    );
    assert_eq!(summary.status, RunStatus::Aborted);
    assert_eq!(summary.skipped, 2);
    assert!(summary.results.iter().all(|result| result.logs.iter().any(|log| log.contains("cancelled"))));
}

#[test]
fn cancellation_between_steps_keeps_finished_work() {
    let descriptor = load(r#"[{"name": "a", "action": "cancel"}, {"name": "b", "action": "ok"}]"#).expect("load");
    let control = RunControl::new();
    let mut registry = lookup_and_tier_registry();
    let handle = control.clone();
    registry.register("cancel", move |_: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> {
        handle.cancel();
        Ok(json!("done"))
    });

    let mut sink = MemorySink::new();
    let summary = execute(&descriptor, &registry, &mut sink, &config(FailurePolicy::HaltOnFailure), &control);

    assert_eq!(summary.status, RunStatus::Aborted);
    assert_eq!(summary.result("a").expect("a").status, StepStatus::Success);
    assert_eq!(summary.result("b").expect("b").status, StepStatus::Skipped);
    assert!(sink.records().is_empty());
}

#[test]
fn records_are_written_per_entity_as_chains_finish() {
    let descriptor = load(
        r#"
workflow: companies
steps:
  - {name: acme_revenue, action: lookup, entity: Acme, field: Revenue}
  - {name: acme_tier, action: tier, entity: Acme, field: Tier, parameters: {value: $acme_revenue}}
  - {name: globex_revenue, action: fail, entity: Globex, field: Revenue}
  - {name: globex_tier, action: tier, entity: Globex, field: Tier, parameters: {value: $globex_revenue}}
"#,
    )
    .expect("load");
    let mut sink = MemorySink::new();
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut sink,
        &config(FailurePolicy::ContinueOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.records_written, 2);
    let records = sink.records();
    assert_eq!(records[0].entity, "Acme");
    assert_eq!(records[0].fields.get("Tier"), Some(&json!("Tier2")));
    assert_eq!(records[1].entity, "Globex");
    assert!(records[1].fields.is_empty());
}

#[test]
fn halting_writes_the_partial_record_of_the_failing_entity() {
    let descriptor = load(
        r#"[
            {"name": "acme_revenue", "action": "lookup", "entity": "Acme"},
            {"name": "acme_contact", "action": "fail", "entity": "Acme"},
            {"name": "acme_tier", "action": "tier", "entity": "Acme", "parameters": {"value": "$acme_revenue"}}
        ]"#,
    )
    .expect("load");
    let mut sink = MemorySink::new();
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut sink,
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.status, RunStatus::Incomplete);
    assert_eq!(sink.records().len(), 1);
    assert_eq!(sink.records()[0].fields.get("acme_revenue"), Some(&json!(1_000_000)));
    assert!(!sink.records()[0].fields.contains_key("acme_tier"));
}

struct RejectingSink;

impl OutputSink for RejectingSink {
    fn write(&mut self, record: &OutputRecord) -> Result<(), WriteError> {
        Err(WriteError::new(&record.entity, "spreadsheet is locked"))
    }
}

#[test]
fn write_errors_are_reported_without_aborting() {
    let descriptor = load(
        r#"[
            {"name": "a", "action": "ok", "entity": "first"},
            {"name": "b", "action": "ok", "entity": "second"}
        ]"#,
    )
    .expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut RejectingSink,
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.write_errors.len(), 2);
    assert!(summary.write_errors[0].contains("spreadsheet is locked"));
    assert_eq!(summary.status, RunStatus::Incomplete);
}

#[test]
fn write_errors_can_halt_the_run() {
    let descriptor = load(
        r#"[
            {"name": "a", "action": "ok", "entity": "first"},
            {"name": "b", "action": "ok", "entity": "second"}
        ]"#,
    )
    .expect("load");
    let mut config = config(FailurePolicy::HaltOnFailure);
    config.halt_on_write_error = true;
    let summary = execute(&descriptor, &lookup_and_tier_registry(), &mut RejectingSink, &config, &RunControl::new());

    assert_eq!(summary.write_errors.len(), 1);
    assert_eq!(summary.result("b").expect("b").status, StepStatus::Skipped);
    assert_eq!(summary.status, RunStatus::Incomplete);
}

#[test]
fn handlers_observe_only_earlier_outputs() {
    let descriptor = load(r#"[{"name": "first", "action": "ok"}, {"name": "probe", "action": "probe"}, {"name": "last", "action": "ok"}]"#)
        .expect("load");
    let mut registry = lookup_and_tier_registry();
    registry.register("probe", |_: &Parameters, context: &ExecutionContext| -> Result<Value, HandlerError> {
        Ok(json!(context.iter().map(|(step, _)| step.to_string()).collect::<Vec<_>>()))
    });
    let summary = execute(
        &descriptor,
        &registry,
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );
    assert_eq!(summary.result("probe").expect("probe").output, Some(json!(["first"])));
}

#[test]
fn duplicate_names_never_reach_execution() {
    let error = load(r#"[{"name": "a", "action": "ok"}, {"name": "a", "action": "ok"}]"#).expect_err("duplicate");
    assert!(matches!(error, DescriptorError::DuplicateStepName(name) if name == "a"));
}

#[test]
fn summary_serializes_with_snake_case_statuses() {
    let descriptor = load(r#"[{"name": "a", "action": "fail"}]"#).expect("load");
    let summary = execute(
        &descriptor,
        &lookup_and_tier_registry(),
        &mut MemorySink::new(),
        &config(FailurePolicy::HaltOnFailure),
        &RunControl::new(),
    );
    let value = serde_json::to_value(&summary).expect("serialize");
    assert_eq!(value["status"], json!("incomplete"));
    assert_eq!(value["results"][0]["status"], json!("failed"));
    assert_eq!(value["results"][0]["error"]["kind"], json!("handler_error"));
}
