//! Company revenue lookup from search snippets.

use std::sync::Arc;

use once_cell::sync::Lazy;
use prospect_api::SearchProvider;
use prospect_engine::{ActionHandler, ExecutionContext, Parameters, required_str};
use prospect_types::HandlerError;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::search_failure;

static REVENUE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\$[\d,]+\.?\d*\s*(?:billion|million|trillion))").expect("valid revenue regex"));

/// Extracts the first revenue figure in `text`, normalised to US dollars.
///
/// Recognises `$<number> billion|million|trillion` (case-insensitive, commas
/// allowed). Zero or unparseable figures are ignored.
pub fn parse_revenue(text: &str) -> Option<f64> {
    let capture = REVENUE_PATTERN.captures(text)?.get(1)?.as_str().to_lowercase();
    let multiplier = if capture.contains("billion") {
        1_000_000_000.0
    } else if capture.contains("million") {
        1_000_000.0
    } else {
        1_000_000_000_000.0
    };
    let digits: String = capture.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let value = digits.parse::<f64>().ok()? * multiplier;
    (value > 0.0).then_some(value)
}

/// `revenue_lookup {company}`: searches for the company's annual revenue.
pub struct RevenueLookup {
    search: Arc<dyn SearchProvider>,
    results: u32,
}

impl RevenueLookup {
    pub fn new(search: Arc<dyn SearchProvider>, results: u32) -> Self {
        Self {
            search,
            results: results.max(1),
        }
    }
}

impl ActionHandler for RevenueLookup {
    fn invoke(&self, parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
        let company = required_str(parameters, "company")?;
        let query = format!("\"{company}\" annual revenue");
        let results = self.search.search(&query, self.results).map_err(search_failure)?;

        for result in results.iter().filter(|result| !result.snippet.is_empty()) {
            if let Some(revenue) = parse_revenue(&result.snippet) {
                info!(company = %company, revenue, "revenue found");
                return Ok(json!(revenue));
            }
        }
        debug!(company = %company, results = results.len(), "no revenue figure in search snippets");
        Err(HandlerError::permanent(format!("no revenue found for '{company}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubSearch, hit};
    use indexmap::indexmap;

    #[test]
    fn parses_scaled_amounts() {
        assert_eq!(parse_revenue("Revenue was $1.2 billion last year"), Some(1_200_000_000.0));
        assert_eq!(parse_revenue("about $350 Million"), Some(350_000_000.0));
        assert_eq!(parse_revenue("$1,500 million in sales"), Some(1_500_000_000.0));
        assert_eq!(parse_revenue("a $2 TRILLION company"), Some(2_000_000_000_000.0));
    }

    #[test]
    fn ignores_unscaled_or_zero_amounts() {
        assert_eq!(parse_revenue("Revenue: $5,000"), None);
        assert_eq!(parse_revenue("$0 million"), None);
        assert_eq!(parse_revenue("no figures here"), None);
    }

    #[test]
    fn returns_first_snippet_with_a_figure() {
        let search = Arc::new(
            StubSearch::default().with(
                "\"Acme\" annual revenue",
                vec![
                    hit("Acme", "https://a", ""),
                    hit("Acme", "https://b", "Acme is a widget maker"),
                    hit("Acme", "https://c", "Acme reported $750 million in revenue"),
                    hit("Acme", "https://d", "Acme reported $9 billion in revenue"),
                ],
            ),
        );
        let handler = RevenueLookup::new(search.clone(), 5);
        let parameters = indexmap! { "company".to_string() => json!("Acme") };

        let revenue = handler.invoke(&parameters, &ExecutionContext::default()).expect("revenue");
        assert_eq!(revenue, json!(750_000_000.0));
        assert_eq!(search.queries(), vec!["\"Acme\" annual revenue".to_string()]);
    }

    #[test]
    fn missing_figures_and_parameters_are_permanent() {
        let handler = RevenueLookup::new(Arc::new(StubSearch::default()), 5);
        let context = ExecutionContext::default();

        let error = handler
            .invoke(&indexmap! { "company".to_string() => json!("Nowhere Inc") }, &context)
            .expect_err("no revenue");
        assert!(!error.is_retryable());

        let error = handler
            .invoke(&indexmap! { "company".to_string() => json!("") }, &context)
            .expect_err("empty company");
        assert!(!error.is_retryable());
    }

    #[test]
    fn server_errors_are_transient() {
        let handler = RevenueLookup::new(Arc::new(StubSearch::default().failing("\"Acme\" annual revenue", 503)), 5);
        let error = handler
            .invoke(&indexmap! { "company".to_string() => json!("Acme") }, &ExecutionContext::default())
            .expect_err("503");
        assert!(error.is_retryable());
    }
}
