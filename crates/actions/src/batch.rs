//! Builds one workflow covering a batch of companies and contacts.
//!
//! Per company: its input columns, then `revenue_<slug>` and `tier_<slug>`.
//! Per contact: its input columns, then `profile_<slug>`, `domain_<slug>`,
//! `email_<slug>` and the enrichment source. Every row gets its own entity,
//! so every row becomes exactly one output record.

use std::collections::HashSet;

use indexmap::IndexMap;
use prospect_types::{StepDefinition, WorkflowDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{CLASSIFY_TIER, COMPANY_DOMAIN, GUESS_EMAIL, INPUT_COLUMN, PROFILE_LOOKUP, REVENUE_LOOKUP, columns::literal_parameters};

pub const WORKFLOW_NAME: &str = "enrichment";
pub const COMPANY_NAME_FIELD: &str = "Company Name";
pub const REVENUE_FIELD: &str = "Estimated revenue (basis public data)";
pub const TIER_FIELD: &str = "Calculated Tier";
pub const FULL_NAME_FIELD: &str = "Full Name";
pub const CURRENT_COMPANY_FIELD: &str = "Current Company";
pub const PROFILE_FIELD: &str = "Profile";
pub const DOMAIN_FIELD: &str = "Company Domain";
pub const EMAIL_FIELD: &str = "Work Email";
pub const SOURCE_FIELD: &str = "EnrichmentSource";
pub const ENRICHMENT_SOURCE: &str = "SerpApi";

/// Company input row. Accepts spreadsheet-style column names as aliases;
/// any other column is kept and carried into the output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRow {
    #[serde(alias = "Company Name")]
    pub company: String,
    #[serde(flatten)]
    pub columns: IndexMap<String, Value>,
}

impl CompanyRow {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            columns: IndexMap::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>, value: Value) -> Self {
        self.columns.insert(column.into(), value);
        self
    }
}

/// Contact input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRow {
    #[serde(alias = "Full Name")]
    pub name: String,
    #[serde(alias = "Current Company")]
    pub company: String,
    #[serde(flatten)]
    pub columns: IndexMap<String, Value>,
}

impl ContactRow {
    pub fn new(name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            company: company.into(),
            columns: IndexMap::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>, value: Value) -> Self {
        self.columns.insert(column.into(), value);
        self
    }

    /// Entity key used for this contact's record.
    pub fn entity(&self) -> String {
        format!("{} @ {}", self.name.trim(), self.company.trim())
    }
}

/// Assembles the enrichment workflow. Rows with blank names are skipped.
///
/// Input columns that collide with an enriched field are dropped in favour of
/// the enriched value.
pub fn build_enrichment_workflow(companies: &[CompanyRow], contacts: &[ContactRow]) -> WorkflowDescriptor {
    let mut builder = BatchBuilder::default();

    for row in companies.iter().filter(|row| !row.company.trim().is_empty()) {
        let company = row.company.trim();
        let slug = builder.slugs.claim(&slugify(company), "_");
        let entity = builder.entities.claim(company, " #");

        builder.column(&slug, &entity, COMPANY_NAME_FIELD, &json!(company));
        for (column, value) in &row.columns {
            if ![COMPANY_NAME_FIELD, REVENUE_FIELD, TIER_FIELD].contains(&column.as_str()) {
                builder.column(&slug, &entity, column, value);
            }
        }

        let revenue = format!("revenue_{slug}");
        builder.steps.push(
            StepDefinition::new(&revenue, REVENUE_LOOKUP)
                .with_parameter("company", json!(company))
                .with_entity(&entity)
                .with_field(REVENUE_FIELD),
        );
        builder.steps.push(
            StepDefinition::new(format!("tier_{slug}"), CLASSIFY_TIER)
                .with_parameter("revenue", json!(format!("${revenue}")))
                .with_entity(&entity)
                .with_field(TIER_FIELD),
        );
    }

    for row in contacts.iter().filter(|row| !row.name.trim().is_empty()) {
        let name = row.name.trim();
        let company = row.company.trim();
        let slug = builder.slugs.claim(&slugify(name), "_");
        let entity = builder.entities.claim(&row.entity(), " #");

        builder.column(&slug, &entity, FULL_NAME_FIELD, &json!(name));
        builder.column(&slug, &entity, CURRENT_COMPANY_FIELD, &json!(company));
        let enriched = [FULL_NAME_FIELD, CURRENT_COMPANY_FIELD, PROFILE_FIELD, DOMAIN_FIELD, EMAIL_FIELD, SOURCE_FIELD];
        for (column, value) in &row.columns {
            if !enriched.contains(&column.as_str()) {
                builder.column(&slug, &entity, column, value);
            }
        }

        let domain = format!("domain_{slug}");
        builder.steps.push(
            StepDefinition::new(format!("profile_{slug}"), PROFILE_LOOKUP)
                .with_parameter("name", json!(name))
                .with_parameter("company", json!(company))
                .with_entity(&entity)
                .with_field(PROFILE_FIELD),
        );
        builder.steps.push(
            StepDefinition::new(&domain, COMPANY_DOMAIN)
                .with_parameter("company", json!(company))
                .with_entity(&entity)
                .with_field(DOMAIN_FIELD),
        );
        builder.steps.push(
            StepDefinition::new(format!("email_{slug}"), GUESS_EMAIL)
                .with_parameter("name", json!(name))
                .with_parameter("domain", json!(format!("${domain}")))
                .with_entity(&entity)
                .with_field(EMAIL_FIELD),
        );
        builder.column(&slug, &entity, SOURCE_FIELD, &json!(ENRICHMENT_SOURCE));
    }

    WorkflowDescriptor {
        workflow: Some(WORKFLOW_NAME.to_string()),
        steps: builder.steps,
    }
}

#[derive(Default)]
struct BatchBuilder {
    steps: Vec<StepDefinition>,
    slugs: UniqueNames,
    entities: UniqueNames,
    column_steps: UniqueNames,
}

impl BatchBuilder {
    /// Adds an `input_column` step that copies `value` into the record.
    fn column(&mut self, slug: &str, entity: &str, column: &str, value: &Value) {
        let name = self.column_steps.claim(&format!("column_{slug}_{}", slugify(column)), "_");
        let mut step = StepDefinition::new(name, INPUT_COLUMN).with_entity(entity).with_field(column);
        step.parameters = literal_parameters(value);
        self.steps.push(step);
    }
}

/// Hands out names unique within one namespace by appending `<sep>2`, `<sep>3`, ...
#[derive(Default)]
struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    fn claim(&mut self, base: &str, separator: &str) -> String {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        while !self.used.insert(candidate.clone()) {
            candidate = format!("{base}{separator}{suffix}");
            suffix += 1;
        }
        candidate
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_ascii_alphanumeric() {
            slug.push(character.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() { "row".to_string() } else { slug.to_string() }
}
