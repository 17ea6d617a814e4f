use thiserror::Error;

use crate::cancel::CancelReason;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can surface from a search run.
///
/// Per-file and per-directory-entry failures never appear here: those are
/// recovered locally, logged, and counted in the summary. Only errors that
/// stop a pipeline from starting (configuration) or from finishing
/// (cancellation) reach the caller.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid include pattern: {0}")]
    InvalidPattern(String),
    #[error("Search cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("Harvest error: {message} ({url})")]
    Harvest { url: String, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn harvest_error(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Harvest {
            url: url.into(),
            message: message.into(),
        }
    }

    /// True when the error is the terminal condition of a cancelled run.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SearchError::config_error("concurrency must be at least 1");
        assert!(matches!(err, SearchError::Config(_)));

        let err = SearchError::invalid_pattern("unclosed group");
        assert!(matches!(err, SearchError::InvalidPattern(_)));

        let err = SearchError::harvest_error("http://example.com/a.zip", "no content length");
        assert!(matches!(err, SearchError::Harvest { .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::config_error("concurrency must be at least 1");
        assert_eq!(
            err.to_string(),
            "Configuration error: concurrency must be at least 1"
        );

        let err = SearchError::invalid_pattern("regex parse error");
        assert_eq!(err.to_string(), "Invalid include pattern: regex parse error");

        let err = SearchError::Cancelled(CancelReason::Timeout);
        assert_eq!(err.to_string(), "Search cancelled: timeout elapsed");
        assert!(err.is_cancelled());
    }
}
