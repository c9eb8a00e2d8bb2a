//! Revenue tier classification.

use prospect_engine::{ActionHandler, ExecutionContext, Parameters};
use prospect_types::HandlerError;
use serde_json::Value;

/// Maps USD revenue to a customer tier.
pub fn classify_tier(revenue: f64) -> &'static str {
    if revenue > 1_000_000_000.0 {
        "Super Platinum"
    } else if revenue >= 500_000_000.0 {
        "Platinum"
    } else if revenue >= 100_000_000.0 {
        "Diamond"
    } else {
        "Gold"
    }
}

/// `classify_tier {revenue}`. Accepts a number or a numeric string.
pub struct ClassifyTier;

impl ActionHandler for ClassifyTier {
    fn invoke(&self, parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
        let revenue = match parameters.get("revenue") {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
        .filter(|revenue| revenue.is_finite())
        .ok_or_else(|| HandlerError::permanent("parameter 'revenue' must be numeric"))?;

        Ok(Value::String(classify_tier(revenue).to_string()))
    }
}
