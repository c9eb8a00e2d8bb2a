//! # Prospect Engine
//!
//! Loads declarative workflow descriptors and executes their steps against a
//! registry of named action handlers.
//!
//! ## Key Features
//!
//! - **Descriptor Loading**: JSON or YAML documents, validated up front
//! - **Step References**: `$step.path` and `${{ steps.step.path }}` substitution
//! - **Failure Policies**: halt on the first failure or keep going
//! - **Retries**: transient handler failures are retried with a fixed backoff
//! - **Incremental Output**: per-entity records are written as they complete
//!
//! ## Usage
//!
//! ```rust
//! use prospect_engine::{ActionRegistry, ExecutionContext, MemorySink, Parameters, RunControl, execute, load};
//! use prospect_types::{ExecutorConfig, HandlerError};
//! use serde_json::{Value, json};
//!
//! let descriptor = load(r#"[{"name": "greet", "action": "echo", "parameters": {"who": "Acme"}}]"#)?;
//!
//! let mut registry = ActionRegistry::new();
//! registry.register("echo", |parameters: &Parameters, _: &ExecutionContext| -> Result<Value, HandlerError> {
//!     Ok(json!(format!("hello {}", parameters["who"].as_str().unwrap_or_default())))
//! });
//!
//! let mut sink = MemorySink::new();
//! let summary = execute(&descriptor, &registry, &mut sink, &ExecutorConfig::default(), &RunControl::new());
//! assert!(summary.is_complete());
//! assert_eq!(sink.records()[0].fields["greet"], json!("hello Acme"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`workflow`**: descriptor parsing and load-time validation
//! - **`resolve`**: parameter substitution from earlier step outputs
//! - **`context`**: the write-once store of step outputs
//! - **`executor`**: step dispatch, retries, failure policy, and output sinks

pub mod context;
pub mod executor;
pub mod resolve;
pub mod workflow;

pub use context::ExecutionContext;
pub use executor::{
    ActionHandler, ActionRegistry, JsonLinesSink, MemorySink, OutputSink, Parameters, RunControl, execute, execute_with_context,
    optional_str, required_str,
};
pub use workflow::{load, load_file};
