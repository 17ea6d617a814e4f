use regex::RegexSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::SearchOptions;
use crate::errors::{SearchError, SearchResult};

/// Extensions that are never worth a line-by-line scan. The comparison is
/// case-insensitive and made against the extension without its dot.
const IGNORED_EXTENSIONS: &[&str] = &["jar", "tar", "zip", "bin"];

/// File-admission policy for one pipeline run. Compiled once from
/// [`SearchOptions`] and read-only afterwards.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    pub root: PathBuf,
    pub skip_hidden: bool,
    include: Option<RegexSet>,
}

impl FilterPolicy {
    pub fn new(
        root: impl Into<PathBuf>,
        skip_hidden: bool,
        include_patterns: &[String],
    ) -> SearchResult<Self> {
        let include = if include_patterns.is_empty() {
            None
        } else {
            Some(
                RegexSet::new(include_patterns)
                    .map_err(|e| SearchError::invalid_pattern(e.to_string()))?,
            )
        };
        Ok(FilterPolicy {
            root: root.into(),
            skip_hidden,
            include,
        })
    }

    pub fn from_options(options: &SearchOptions) -> SearchResult<Self> {
        Self::new(&options.root, options.skip_hidden, &options.include_patterns)
    }

    /// Whether a regular file passes the extension and include-pattern
    /// checks. Directory pruning happens earlier, during the walk.
    pub fn admits(&self, path: &Path) -> bool {
        !has_ignored_extension(path) && self.matches_include(path)
    }

    fn matches_include(&self, path: &Path) -> bool {
        let Some(set) = &self.include else {
            return true;
        };
        if let Some(name) = path.file_name() {
            if set.is_match(&name.to_string_lossy()) {
                return true;
            }
        }
        set.is_match(&path.to_string_lossy())
    }
}

/// Checks whether a file's extension is on the fixed ignore list
pub fn has_ignored_extension(path: &Path) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) => IGNORED_EXTENSIONS
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Checks whether a directory entry name marks a hidden subtree
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_extensions() {
        assert!(has_ignored_extension(Path::new("archive.zip")));
        assert!(has_ignored_extension(Path::new("lib.jar")));
        assert!(has_ignored_extension(Path::new("backup.tar")));
        assert!(has_ignored_extension(Path::new("dump.bin")));
        assert!(has_ignored_extension(Path::new("archive.ZIP"))); // case insensitivity

        assert!(!has_ignored_extension(Path::new("notes.txt")));
        assert!(!has_ignored_extension(Path::new("zip"))); // no extension
        assert!(!has_ignored_extension(Path::new("archive.zip.txt")));
    }

    #[test]
    fn test_hidden_names() {
        assert!(is_hidden_name(OsStr::new(".git")));
        assert!(is_hidden_name(OsStr::new(".hidden")));
        assert!(!is_hidden_name(OsStr::new("git")));
        assert!(!is_hidden_name(OsStr::new("visible.dir")));
    }

    #[test]
    fn test_admits_without_patterns() {
        let policy = FilterPolicy::new("/tmp", true, &[]).unwrap();
        assert!(policy.admits(Path::new("/tmp/a/notes.txt")));
        assert!(!policy.admits(Path::new("/tmp/a/archive.zip")));
    }

    #[test]
    fn test_include_matches_name_or_path() {
        let patterns = vec![r"\.txt$".to_string()];
        let policy = FilterPolicy::new("/tmp", true, &patterns).unwrap();
        assert!(policy.admits(Path::new("/tmp/a/notes.txt")));
        assert!(!policy.admits(Path::new("/tmp/a/notes.log")));

        // A pattern can also select by path component.
        let patterns = vec!["vendor/".to_string()];
        let policy = FilterPolicy::new("/tmp", true, &patterns).unwrap();
        assert!(policy.admits(Path::new("/tmp/vendor/readme")));
        assert!(!policy.admits(Path::new("/tmp/src/readme")));
    }

    #[test]
    fn test_any_pattern_admits() {
        let patterns = vec![r"\.rs$".to_string(), r"\.toml$".to_string()];
        let policy = FilterPolicy::new("/tmp", true, &patterns).unwrap();
        assert!(policy.admits(Path::new("main.rs")));
        assert!(policy.admits(Path::new("Cargo.toml")));
        assert!(!policy.admits(Path::new("readme.md")));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let patterns = vec!["[unclosed".to_string()];
        let err = FilterPolicy::new("/tmp", true, &patterns).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
    }
}
