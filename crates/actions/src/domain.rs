//! Company web domain discovery.

use std::sync::Arc;

use prospect_api::SearchProvider;
use prospect_engine::{ActionHandler, ExecutionContext, Parameters, required_str};
use prospect_types::HandlerError;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::search_failure;

/// Host of `link` without a leading `www.`.
pub fn domain_of(link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

/// `company_domain {company}`: the host of the company's official website.
pub struct CompanyDomain {
    search: Arc<dyn SearchProvider>,
}

impl CompanyDomain {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }
}

impl ActionHandler for CompanyDomain {
    fn invoke(&self, parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
        let company = required_str(parameters, "company")?;
        let query = format!("\"{company}\" official website");
        let results = self.search.search(&query, 1).map_err(search_failure)?;

        let domain = results
            .first()
            .and_then(|top| domain_of(&top.link))
            .ok_or_else(|| HandlerError::permanent(format!("could not find a website for '{company}'")))?;
        debug!(company = %company, domain = %domain, "company domain resolved");
        Ok(Value::String(domain))
    }
}
