// src/error.rs
//! Error taxonomy shared by the adapters, the store and the aggregation pipeline.

/// Errors raised below the orchestrator. Source-level variants are caught at the
/// call site and folded into the run summary; they never escape `Aggregator::run`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport or parse failure from one upstream source.
    #[error("{source_name} fetch failed: {message}")]
    SourceFetch {
        source_name: &'static str,
        message: String,
    },

    /// The per-call deadline elapsed before the source answered.
    #[error("{source_name} timed out after {secs}s")]
    Timeout { source_name: &'static str, secs: u64 },

    /// Missing credential or invalid setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transform called without both required stages succeeding.
    #[error("missing required source: {0}")]
    MissingRequiredSource(&'static str),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn fetch(source_name: &'static str, message: impl std::fmt::Display) -> Self {
        Error::SourceFetch {
            source_name,
            message: message.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
