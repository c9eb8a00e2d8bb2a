//! Error taxonomy for loading and executing workflows.
//!
//! Load-time errors ([`DescriptorError`]) abort before any step runs. Run-time
//! errors ([`StepError`]) are captured into step results and never escape the
//! executor. Handlers report failures through [`HandlerError`], sinks through
//! [`WriteError`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading and validating a workflow descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("malformed workflow descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("duplicate step name '{0}'")]
    DuplicateStepName(String),

    #[error("step '{0}' does not name an action")]
    MissingAction(String),

    #[error("step '{step}' references '{reference}', which is not an earlier step")]
    ForwardReference { step: String, reference: String },

    #[error("failed to read workflow descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DescriptorError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedDescriptor(detail.into())
    }

    pub fn forward_reference(step: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::ForwardReference {
            step: step.into(),
            reference: reference.into(),
        }
    }
}

/// Per-step failure captured into a step result.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    #[error("no handler registered for action '{action}'")]
    UnknownAction { action: String },

    #[error("step '{dependency}' has no recorded output")]
    UnresolvedDependency { dependency: String },

    #[error("handler failed: {detail}")]
    HandlerError { detail: String, retryable: bool },
}

impl StepError {
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction { action: action.into() }
    }

    pub fn unresolved_dependency(dependency: impl Into<String>) -> Self {
        Self::UnresolvedDependency {
            dependency: dependency.into(),
        }
    }
}

impl From<HandlerError> for StepError {
    fn from(error: HandlerError) -> Self {
        let retryable = error.is_retryable();
        Self::HandlerError {
            detail: error.message().to_string(),
            retryable,
        }
    }
}

/// Failure reported by an action handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// Temporary condition (timeout, rate limit, 5xx); the executor may retry.
    #[error("transient: {0}")]
    Transient(String),

    /// Failure that will not change on retry (bad parameters, no data found).
    #[error("{0}")]
    Permanent(String),
}

impl HandlerError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Permanent(message) => message,
        }
    }
}

/// Failure reported by an output sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to write record for entity '{entity}': {message}")]
pub struct WriteError {
    pub entity: String,
    pub message: String,
}

impl WriteError {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
