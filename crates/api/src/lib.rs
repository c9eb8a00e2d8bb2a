//! Web search client used by the enrichment actions.
//!
//! This module provides a lightweight client for the SerpApi Google search
//! endpoint. It focuses on:
//!
//! - Discovering the API key from `SERPAPI_API_KEY`
//! - Validating the configured base URL for safety
//! - Classifying failures as retryable (transport, 429, 5xx) or not
//!
//! Callers program against the [`SearchProvider`] trait so that actions can be
//! exercised with canned results in tests.
//!
//! # Example
//!
//! ```ignore
//! use prospect_api::{SearchProvider, SerpApiClient};
//! use prospect_types::SearchSettings;
//!
//! let client = SerpApiClient::from_env(&SearchSettings::default())?;
//! for hit in client.search("\"Acme\" annual revenue", 5)? {
//!     println!("{} -> {}", hit.title, hit.link);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::env;

use anyhow::{Context, Result, anyhow};
use prospect_types::SearchSettings;
use prospect_util::{block_on_future, redact_sensitive};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Environment variable holding the SerpApi key.
pub const API_KEY_ENV: &str = "SERPAPI_API_KEY";
/// Public SerpApi endpoint.
pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";
/// Placeholder shipped in sample `.env` files; treated as unset.
const PLACEHOLDER_KEY: &str = "your_api_key_here";
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// One organic search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Failure while querying the search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("SERPAPI_API_KEY is not set")]
    MissingApiKey,

    #[error("search request failed: {0}")]
    Transport(String),

    #[error("search provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("search provider error: {0}")]
    Provider(String),
}

impl SearchError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500,
            Self::MissingApiKey | Self::Provider(_) => false,
        }
    }
}

/// Executes web searches and returns organic results.
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<OrganicResult>, SearchError>;
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for SerpApi access.
pub struct SerpApiClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl SerpApiClient {
    /// Construct a client using `SERPAPI_API_KEY` and the configured settings.
    pub fn from_env(settings: &SearchSettings) -> Result<Self> {
        let api_key = api_key_from_env().ok_or(SearchError::MissingApiKey)?;
        Self::new(settings, api_key)
    }

    /// Construct a client from explicit dependencies.
    pub fn new(settings: &SearchSettings, api_key: impl Into<String>) -> Result<Self> {
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        validate_base_url(&base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(format!("prospect/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS))
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http,
        })
    }

    async fn fetch(http: Client, url: String, query: Vec<(&'static str, String)>) -> Result<Value, SearchError> {
        let response = http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|error| SearchError::Transport(redact_sensitive(&error.to_string())))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| SearchError::Transport(redact_sensitive(&error.to_string())))?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }
        serde_json::from_str(&body).map_err(|error| SearchError::Provider(format!("invalid JSON payload: {error}")))
    }
}

impl SearchProvider for SerpApiClient {
    fn search(&self, query: &str, limit: u32) -> Result<Vec<OrganicResult>, SearchError> {
        debug!(query = %query, limit, "issuing web search");
        let url = format!("{}/search.json", self.base_url);
        let params = vec![
            ("engine", "google".to_string()),
            ("q", query.to_string()),
            ("num", limit.to_string()),
            ("api_key", self.api_key.clone()),
        ];
        let http = self.http.clone();
        let payload = block_on_future(async move { Self::fetch(http, url, params).await.map_err(anyhow::Error::from) })
            .map_err(|error| match error.downcast::<SearchError>() {
                Ok(search_error) => search_error,
                Err(other) => SearchError::Transport(other.to_string()),
            })?;
        parse_search_payload(&payload, limit)
    }
}

/// Extract organic results from a SerpApi payload, honoring `limit`.
pub fn parse_search_payload(payload: &Value, limit: u32) -> Result<Vec<OrganicResult>, SearchError> {
    if let Some(message) = payload.get("error").and_then(Value::as_str) {
        // "no results" is reported as an error by the provider but is an empty result set for us.
        if message.to_ascii_lowercase().contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        return Err(SearchError::Provider(message.to_string()));
    }
    let results = payload
        .get("organic_results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<OrganicResult>(item.clone()).ok())
                .take(limit as usize)
                .collect()
        })
        .unwrap_or_default();
    Ok(results)
}

fn api_key_from_env() -> Option<String> {
    env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty() && !key.contains(PLACEHOLDER_KEY))
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid search base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("search base URL must include a host"))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "search base URL must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        ));
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
