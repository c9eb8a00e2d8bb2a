pub mod async_runtime;
pub mod config;
pub mod path_processing;

pub use async_runtime::block_on_future;
pub use config::{CONFIG_PATH_ENV, default_config_path, load_config, load_config_from};
pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)",
        r"(?i)(api_key=)([^\s&]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// Covers authorization headers, `*_KEY=`/`*_TOKEN=` style assignments, and
/// `api_key=` query parameters in request URLs.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SENSITIVE_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::redact_sensitive;

    #[test]
    fn redacts_api_key_query_parameter() {
        let url = "https://serpapi.com/search.json?q=acme&api_key=abc123&num=5";
        let redacted = redact_sensitive(url);
        assert!(!redacted.contains("abc123"), "secret leaked: {redacted}");
        assert!(redacted.contains("num=5"));
    }

    #[test]
    fn redacts_env_style_assignments() {
        let redacted = redact_sensitive("SERPAPI_API_KEY=topsecret other=value");
        assert_eq!(redacted, "SERPAPI_API_KEY=<redacted> other=value");
    }
}
