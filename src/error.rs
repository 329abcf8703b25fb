//! Error types for the subtitle pipeline

use thiserror::Error;

use crate::pipeline::analyzer::AnalyzerError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level failures.
///
/// Per-sentence problems and per-item mapping problems are not errors; they are
/// reported as `SentenceOutcome` and `MappingIssue` values so a run always
/// completes with everything that did succeed.
#[derive(Error, Debug)]
pub enum Error {
    /// group_size must be at least 1
    #[error("Invalid group size: {0} (must be >= 1)")]
    InvalidGroupSize(usize),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Analyzer could not be constructed (dictionary missing or corrupt)
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// Generated response could not be decoded at all
    #[error("Response error: {0}")]
    Response(String),

    /// Run abandoned at a sentence boundary
    #[error("Pipeline cancelled")]
    Cancelled,
}
