// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::config::HttpConfig;
use crate::error::{Error, Result};

pub const USER_AGENT: &str = "brand-weather-aggregator/0.1 (scheduled weather + brand signal snapshots)";

/// Upper bound on a single post body handed to the summarizer.
const MAX_TEXT_CHARS: usize = 1500;

/// Build the shared HTTP client for an upstream source.
pub fn build_http_client(http: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(http.connect_timeout())
        .timeout(http.timeout())
        .build()
        .map_err(|e| Error::Configuration(format!("http client: {e}")))
}

/// Map a reqwest failure to the source's error, keeping timeouts distinguishable.
pub(crate) fn map_http_error(source_name: &'static str, timeout_secs: u64, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            source_name,
            secs: timeout_secs,
        }
    } else {
        Error::fetch(source_name, e)
    }
}

/// Normalize post text: decode HTML entities, collapse whitespace, trim, cap length.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let mut out = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  Gym &amp; Tonic\n\n  review&#x27;s  ";
        assert_eq!(normalize_text(s), "Gym & Tonic review's");
    }

    #[test]
    fn normalize_text_caps_length() {
        let long = "a".repeat(MAX_TEXT_CHARS + 50);
        assert_eq!(normalize_text(&long).chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn normalize_text_empty_stays_empty() {
        assert_eq!(normalize_text("   \n\t"), "");
    }
}
