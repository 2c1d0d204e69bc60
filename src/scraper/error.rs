//! Shared error type for the classify/fetch/extract pipeline.

use thiserror::Error;

/// Pipeline error covering link validation, fetching, and extraction.
///
/// Fetch and extraction failures are reported to end users as one generic
/// notice (see [user_notice](ScraperError::user_notice)); the variants exist
/// for logs and for callers that need to distinguish causes.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid link: {input}")]
    InvalidLink { input: String },

    // Fetching
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} when fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },

    /// The adult-content interstitial appeared again after following its
    /// proceed link once. At most one redirect hop is allowed.
    #[error("Adult-content interstitial persisted at {url}")]
    AdultGateLoop { url: String },

    // Extraction
    #[error("Missing {what} at {url}")]
    MissingElement { what: &'static str, url: String },

    #[error("Unexpected page shape at {url}: {reason}")]
    UnexpectedShape { url: String, reason: String },
}

impl ScraperError {
    /// The short, generic user-facing notice for any fetch or extraction
    /// failure. Extraction internals are never exposed to end users.
    pub fn user_notice(&self) -> &'static str {
        match self {
            ScraperError::InvalidLink { .. } => "Invalid link.",
            _ => "Failed to retrieve story.",
        }
    }
}
