//! Human-friendly duration parsing shared by configuration and the CLI.

use std::time::Duration;

/// Parses durations such as `"500ms"`, `"2s"`, `"1m"`, or bare seconds (`"3"`).
///
/// Returns `None` for empty input, unknown suffixes, or non-numeric values.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(millis) = trimmed.strip_suffix("ms") {
        return millis.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    let last = trimmed.chars().last()?;
    if last.is_ascii_alphabetic() {
        let amount: u64 = trimmed[..trimmed.len() - 1].trim().parse().ok()?;
        return match last {
            's' | 'S' => Some(Duration::from_secs(amount)),
            'm' | 'M' => amount.checked_mul(60).map(Duration::from_secs),
            _ => None,
        };
    }
    trimmed.parse::<u64>().ok().map(Duration::from_secs)
}

/// Serde adapter storing a [`Duration`] as a human-readable string.
pub mod serde_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = duration.as_millis();
        if millis % 1000 == 0 {
            serializer.serialize_str(&format!("{}s", millis / 1000))
        } else {
            serializer.serialize_str(&format!("{millis}ms"))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_duration(&text).ok_or_else(|| D::Error::custom(format!("invalid duration '{text}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixes_and_bare_seconds() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("5"), Some(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("3h"), None);
    }

    #[test]
    fn rejects_minutes_that_overflow() {
        assert_eq!(parse_duration("307445734561825861m"), None);
    }
}
