//! Work email guessing.

use prospect_engine::{ActionHandler, ExecutionContext, Parameters, required_str};
use prospect_types::HandlerError;
use serde_json::Value;

/// `first.last@domain`, lower-cased. Needs at least two name parts.
pub fn guess_email(name: &str, domain: &str) -> Option<String> {
    let parts: Vec<&str> = name.split_whitespace().collect();
    let (first, last) = match parts.as_slice() {
        [first, .., last] => (first, last),
        _ => return None,
    };
    let domain = domain.trim().trim_start_matches('@');
    if domain.is_empty() {
        return None;
    }
    Some(format!("{}.{}@{}", first.to_lowercase(), last.to_lowercase(), domain.to_lowercase()))
}

/// `guess_email {name, domain}`.
pub struct GuessEmail;

impl ActionHandler for GuessEmail {
    fn invoke(&self, parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
        let name = required_str(parameters, "name")?;
        let domain = required_str(parameters, "domain")?;
        guess_email(name, domain)
            .map(Value::String)
            .ok_or_else(|| HandlerError::permanent(format!("cannot guess an email for '{name}' without first and last name")))
    }
}
