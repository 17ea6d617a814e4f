use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};

/// Configuration for one search run.
///
/// Options are supplied by the caller (the CLI, a test, or another
/// program); there is no config file and nothing is persisted between runs.
/// Everything here is read-only for the lifetime of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Directory the walk starts from
    pub root: PathBuf,

    /// Substring to look for in each line
    pub query: String,

    /// Regexes a file's name or full path must match to be scanned.
    /// Empty means every file passes this check.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Prune directories whose name starts with `.` (hidden files inside
    /// visible directories are still scanned)
    #[serde(default = "default_skip_hidden")]
    pub skip_hidden: bool,

    /// Number of scanner worker threads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Give up after this long; `None` runs to completion
    #[serde(default)]
    pub timeout: Option<Duration>,
}

fn default_skip_hidden() -> bool {
    true
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

impl SearchOptions {
    /// Options with the default filter policy: hidden directories pruned,
    /// no include patterns, one worker per CPU, no deadline.
    pub fn new(root: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        SearchOptions {
            root: root.into(),
            query: query.into(),
            include_patterns: Vec::new(),
            skip_hidden: default_skip_hidden(),
            concurrency: default_concurrency(),
            timeout: None,
        }
    }

    /// Rejects contradictory settings before any thread is spawned.
    /// Include patterns are validated separately when the filter policy is
    /// compiled.
    pub fn validate(&self) -> SearchResult<()> {
        if self.concurrency == 0 {
            return Err(SearchError::config_error(
                "concurrency must be at least 1",
            ));
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(SearchError::config_error("timeout must be positive"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let options = SearchOptions::new("/tmp", "needle");
        assert_eq!(options.root, PathBuf::from("/tmp"));
        assert_eq!(options.query, "needle");
        assert!(options.include_patterns.is_empty());
        assert!(options.skip_hidden);
        assert_eq!(options.concurrency, num_cpus::get());
        assert_eq!(options.timeout, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut options = SearchOptions::new(".", "x");
        options.concurrency = 0;
        let err = options.validate().unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut options = SearchOptions::new(".", "x");
        options.timeout = Some(Duration::ZERO);
        assert!(options.validate().is_err());

        options.timeout = Some(Duration::from_millis(1));
        assert!(options.validate().is_ok());
    }
}
