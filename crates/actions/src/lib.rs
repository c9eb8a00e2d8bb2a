//! Enrichment actions for the Prospect engine.
//!
//! Each action is an [`ActionHandler`] backed by a [`SearchProvider`]:
//!
//! | action | parameters | output |
//! |---|---|---|
//! | `revenue_lookup` | `company` | USD-normalised revenue (number) |
//! | `classify_tier` | `revenue` | tier name |
//! | `profile_lookup` | `name`, `company` | `{url, designation, confidence}` |
//! | `company_domain` | `company` | bare host name |
//! | `guess_email` | `name`, `domain` | `first.last@domain` |
//! | `input_column` | `value` or `segments` | the input value, unchanged |
//!
//! [`build_enrichment_workflow`] assembles these into a descriptor covering a
//! batch of companies and contacts. `input_column` needs no search; it copies
//! input spreadsheet columns into the records.

use std::sync::Arc;

use prospect_api::{SearchError, SearchProvider};
use prospect_engine::{ActionHandler, ActionRegistry};
use prospect_types::{DesignationOverride, HandlerError, SearchSettings};

pub mod batch;
pub mod columns;
pub mod domain;
pub mod email;
pub mod profile;
pub mod revenue;
pub mod tier;

pub use batch::{CompanyRow, ContactRow, build_enrichment_workflow};
pub use columns::InputColumn;
pub use domain::CompanyDomain;
pub use email::GuessEmail;
pub use profile::{ProfileLookup, extract_designation};
pub use revenue::{RevenueLookup, parse_revenue};
pub use tier::{ClassifyTier, classify_tier};

pub const REVENUE_LOOKUP: &str = "revenue_lookup";
pub const CLASSIFY_TIER: &str = "classify_tier";
pub const PROFILE_LOOKUP: &str = "profile_lookup";
pub const COMPANY_DOMAIN: &str = "company_domain";
pub const GUESS_EMAIL: &str = "guess_email";
pub const INPUT_COLUMN: &str = "input_column";

/// Registers every enrichment action on `registry`.
pub fn register_enrichment_actions(
    registry: &mut ActionRegistry,
    search: Arc<dyn SearchProvider>,
    settings: &SearchSettings,
    overrides: &[DesignationOverride],
) {
    let handlers: [(&str, Arc<dyn ActionHandler>); 6] = [
        (REVENUE_LOOKUP, Arc::new(RevenueLookup::new(search.clone(), settings.results_per_query))),
        (CLASSIFY_TIER, Arc::new(ClassifyTier)),
        (PROFILE_LOOKUP, Arc::new(ProfileLookup::new(search.clone(), overrides.to_vec()))),
        (COMPANY_DOMAIN, Arc::new(CompanyDomain::new(search))),
        (GUESS_EMAIL, Arc::new(GuessEmail)),
        (INPUT_COLUMN, Arc::new(InputColumn)),
    ];
    for (action, handler) in handlers {
        registry.register_shared(action, handler);
    }
}

/// Maps a search failure onto the executor's retry classification.
pub(crate) fn search_failure(error: SearchError) -> HandlerError {
    if error.is_retryable() {
        HandlerError::transient(error.to_string())
    } else {
        HandlerError::permanent(error.to_string())
    }
}
