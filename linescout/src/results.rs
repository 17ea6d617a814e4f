use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One matched line, streamed to the caller as soon as it is found.
///
/// Results from different files may interleave in any order; results from
/// the same file arrive in on-disk line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The query the line was matched against
    pub query: String,
    /// The matching line, trimmed of surrounding whitespace
    pub line: String,
    /// The file the line came from
    pub path: PathBuf,
}

/// Counters shared by the pipeline stages, aggregated lock-free.
#[derive(Debug, Default)]
pub struct ScanStats {
    files_walked: AtomicU64,
    files_scanned: AtomicU64,
    files_skipped: AtomicU64,
    lines_matched: AtomicU64,
}

impl ScanStats {
    pub(crate) fn record_walked(&self) {
        self.files_walked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scanned(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_match(&self) {
        self.lines_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, elapsed: Duration) -> ScanSummary {
        ScanSummary {
            files_walked: self.files_walked.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            lines_matched: self.lines_matched.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// What a finished (or cancelled) run did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Admissible files emitted by the walk
    pub files_walked: u64,
    /// Files scanned to the end
    pub files_scanned: u64,
    /// Files dropped after a local open or read failure
    pub files_skipped: u64,
    /// Matching lines streamed out
    pub lines_matched: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_result_fields() {
        let result = MatchResult {
            query: "hello".to_string(),
            line: "hello world".to_string(),
            path: PathBuf::from("a/x.txt"),
        };
        assert_eq!(result.query, "hello");
        assert_eq!(result.line, "hello world");
        assert_eq!(result.path, PathBuf::from("a/x.txt"));
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = ScanStats::default();
        stats.record_walked();
        stats.record_walked();
        stats.record_scanned();
        stats.record_skipped();
        stats.record_match();
        stats.record_match();
        stats.record_match();

        let summary = stats.snapshot(Duration::from_millis(5));
        assert_eq!(summary.files_walked, 2);
        assert_eq!(summary.files_scanned, 1);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.lines_matched, 3);
        assert_eq!(summary.elapsed, Duration::from_millis(5));
    }
}
