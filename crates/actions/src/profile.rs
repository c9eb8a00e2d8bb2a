//! Professional profile lookup and designation extraction.
//!
//! The top profile hit's title and snippet are mined for a job title with four
//! patterns of decreasing confidence:
//!
//! | pattern | searched in | score |
//! |---|---|---|
//! | `<title> at <company>` / `<title> @ <company>` | title and snippet | 100 |
//! | `<title> - <company>` (also `\|`, `·`) | title | 80 |
//! | `<name>, <title>` at the start | title and snippet | 60 |
//! | `I'm a <title>` / `is a <title>` | snippet | 40 |
//!
//! Candidates mentioning job keywords gain 20 points; the highest score wins,
//! earlier candidates winning ties.

use std::sync::Arc;

use prospect_api::{OrganicResult, SearchProvider};
use prospect_engine::{ActionHandler, ExecutionContext, Parameters, required_str};
use prospect_types::{DesignationOverride, HandlerError};
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::search_failure;

const PROFILE_PATH_MARKER: &str = "linkedin.com/in/";

const IGNORE_KEYWORDS: &[&str] = &[
    "prev",
    "previous",
    "former",
    "ex",
    "student",
    "graduate",
    "university",
    "college",
    "institute",
    "school",
    "academy",
    "linkedin",
    "profile",
    "connections",
    "followers",
    "view",
    "mutual",
    "experience",
    "education",
    "volunteer",
    "skills",
    "endorsements",
    "tufts",
];

const JOB_KEYWORDS: &[&str] = &[
    "manager",
    "director",
    "engineer",
    "lead",
    "head",
    "specialist",
    "sde",
    "intern",
    "consultant",
    "analyst",
    "architect",
    "vp",
    "president",
    "officer",
    "ca",
    "cpa",
    "cma",
];

const JOB_KEYWORD_BONUS: u32 = 20;
const MIN_DESIGNATION_CHARS: usize = 3;
const MAX_DESIGNATION_CHARS: usize = 50;

/// Picks the most plausible job title for `name` at `company` from a search
/// hit's title and snippet.
pub fn extract_designation(name: &str, company: &str, title: &str, snippet: &str) -> Option<String> {
    let full_text = format!("{title} | {snippet}");
    let name_pattern = regex::escape(name);
    let company_pattern = regex::escape(company);
    let mut candidates: Vec<(String, u32)> = Vec::new();

    if let Some(pattern) = compile(&format!(r"(?i)([\w\s,'()-]+?)\s*(?:@|at)\s+{company_pattern}")) {
        candidates.extend(pattern.captures_iter(&full_text).filter_map(|caps| Some((caps.get(1)?.as_str().to_string(), 100))));
    }
    if let Some(pattern) = compile(&format!(r"(?i)([\w\s,'()-]+?)\s*[-|·]\s*{company_pattern}")) {
        candidates.extend(pattern.captures_iter(title).filter_map(|caps| Some((caps.get(1)?.as_str().to_string(), 80))));
    }
    if let Some(text) = compile(&format!(r"(?i)^{name_pattern}\s*[,·-]\s*([^,·|]+)")).and_then(|pattern| first_group(&pattern, &full_text)) {
        candidates.push((text, 60));
    }
    if let Some(text) = compile(r"(?i)(?:i'm a|is a)\s+([\w\s,'()-]+)").and_then(|pattern| first_group(&pattern, snippet)) {
        candidates.push((text, 40));
    }

    let name_prefix = compile(&format!(r"(?i)^{name_pattern}\s*[-–—,·|.]?\s*"));
    let ignored = ignore_keywords(name, company);

    let mut best: Option<(String, u32)> = None;
    for (text, base_score) in candidates {
        let cleaned = match &name_prefix {
            Some(prefix) => prefix.replace(&text, "").trim().to_string(),
            None => text.trim().to_string(),
        };
        let cleaned = cleaned.trim_matches(&[' ', '-', '|', '·', ','][..]).to_string();

        let length = cleaned.chars().count();
        if !(MIN_DESIGNATION_CHARS..=MAX_DESIGNATION_CHARS).contains(&length) || cleaned.contains("...") {
            continue;
        }
        let lowered = cleaned.to_lowercase();
        if ignored.iter().any(|keyword| lowered.contains(keyword.as_str())) {
            continue;
        }

        let score = if JOB_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
            base_score + JOB_KEYWORD_BONUS
        } else {
            base_score
        };
        if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
            best = Some((cleaned, score));
        }
    }
    best.map(|(designation, _)| designation)
}

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

fn first_group(pattern: &Regex, text: &str) -> Option<String> {
    pattern.captures(text)?.get(1).map(|group| group.as_str().to_string())
}

fn ignore_keywords(name: &str, company: &str) -> Vec<String> {
    let mut keywords: Vec<String> = IGNORE_KEYWORDS.iter().map(|keyword| keyword.to_string()).collect();
    keywords.push(company.to_lowercase());
    keywords.extend(
        name.to_lowercase()
            .split_whitespace()
            .filter(|part| part.chars().count() > 2)
            .map(str::to_string),
    );
    keywords
}

/// `profile_lookup {name, company}`: finds the contact's public profile and
/// current designation.
pub struct ProfileLookup {
    search: Arc<dyn SearchProvider>,
    overrides: Vec<DesignationOverride>,
}

impl ProfileLookup {
    pub fn new(search: Arc<dyn SearchProvider>, overrides: Vec<DesignationOverride>) -> Self {
        Self { search, overrides }
    }

    fn top_profile(&self, name: &str, company: &str) -> Result<Option<OrganicResult>, HandlerError> {
        let queries = [
            format!("\"{name}\" \"{company}\" site:linkedin.com"),
            format!("\"{name}\" \"{company}\" linkedin profile site:linkedin.com/in/"),
        ];
        for query in queries {
            let results = self.search.search(&query, 1).map_err(search_failure)?;
            if let Some(top) = results.into_iter().next()
                && top.link.contains(PROFILE_PATH_MARKER)
            {
                return Ok(Some(top));
            }
            debug!(query = %query, "no profile in top result");
        }
        Ok(None)
    }

    fn override_for(&self, name: &str, company: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name) && entry.company.eq_ignore_ascii_case(company))
            .map(|entry| entry.designation.as_str())
    }
}

impl ActionHandler for ProfileLookup {
    fn invoke(&self, parameters: &Parameters, _context: &ExecutionContext) -> Result<Value, HandlerError> {
        let name = required_str(parameters, "name")?;
        let company = required_str(parameters, "company")?;

        let profile = self.top_profile(name, company)?;
        let mut designation = profile
            .as_ref()
            .and_then(|hit| extract_designation(name, company, &hit.title, &hit.snippet));
        if designation.is_none()
            && let Some(manual) = self.override_for(name, company)
        {
            info!(name = %name, company = %company, "using configured designation override");
            designation = Some(manual.to_string());
        }

        let url = profile.map(|hit| hit.link);
        let confidence = if url.is_some() { "Medium" } else { "Low" };
        info!(name = %name, company = %company, found = url.is_some(), designation = ?designation, "profile lookup finished");
        Ok(json!({
            "url": url,
            "designation": designation,
            "confidence": confidence,
        }))
    }
}
