//! Action handlers and the registry that maps action names to them.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;
use prospect_types::HandlerError;
use serde_json::Value;

use crate::context::ExecutionContext;

/// Resolved parameters handed to a handler.
pub type Parameters = IndexMap<String, Value>;

/// Performs the work of one action.
///
/// Handlers get parameters with every step reference already substituted and
/// read-only access to the outputs of earlier steps. Returning
/// [`HandlerError::Transient`] lets the executor retry the invocation.
pub trait ActionHandler: Send + Sync {
    fn invoke(&self, parameters: &Parameters, context: &ExecutionContext) -> Result<Value, HandlerError>;
}

impl<F> ActionHandler for F
where
    F: Fn(&Parameters, &ExecutionContext) -> Result<Value, HandlerError> + Send + Sync,
{
    fn invoke(&self, parameters: &Parameters, context: &ExecutionContext) -> Result<Value, HandlerError> {
        self(parameters, context)
    }
}

/// Name to handler lookup used by the executor.
///
/// Registering a name twice replaces the earlier handler.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: impl Into<String>, handler: impl ActionHandler + 'static) -> &mut Self {
        self.handlers.insert(action.into(), Arc::new(handler));
        self
    }

    /// Registers a handler that is already shared.
    pub fn register_shared(&mut self, action: impl Into<String>, handler: Arc<dyn ActionHandler>) -> &mut Self {
        self.handlers.insert(action.into(), handler);
        self
    }

    pub fn get(&self, action: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ActionRegistry")
            .field("actions", &self.action_names())
            .finish()
    }
}

/// Reads a required, non-blank string parameter.
pub fn required_str<'a>(parameters: &'a Parameters, key: &str) -> Result<&'a str, HandlerError> {
    match parameters.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(HandlerError::permanent(format!("missing required parameter '{key}'"))),
        Some(other) => Err(HandlerError::permanent(format!("parameter '{key}' must be a string, got {other}"))),
    }
}

/// Reads an optional string parameter; blank strings and `null` count as absent.
pub fn optional_str<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
