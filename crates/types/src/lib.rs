//! Shared type definitions for the Prospect workspace.
//!
//! The loader, executor, actions, and CLI all speak in terms of the types
//! declared here: workflow descriptors and their steps, per-step results, the
//! run summary, output records, executor configuration, and the error
//! taxonomy surfaced at load time and run time.

pub mod config;
pub mod duration;
pub mod errors;
pub mod references;
pub mod workflow;

pub use config::{DesignationOverride, ExecutorConfig, FailurePolicy, ProspectConfig, SearchSettings};
pub use duration::parse_duration;
pub use errors::{ConfigError, DescriptorError, HandlerError, StepError, WriteError};
pub use references::{StepReference, collect_step_references, parse_reference};
pub use workflow::{OutputRecord, RunStatus, RunSummary, StepDefinition, StepResult, StepStatus, WorkflowDescriptor};
