use std::path::Path;
use tracing::debug;

/// Placeholder for in-place archive extraction.
///
/// Downloaded archives are currently left untouched; the search pipeline
/// never opens them (their extensions are on the ignore list), so only
/// files unpacked by an external tool end up scanned. This is the seam
/// where unpacking will live.
pub fn extract_archive(path: &Path) -> &Path {
    debug!(
        "extraction not implemented, leaving {} in place",
        path.display()
    );
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_left_in_place() {
        let path = Path::new("harvest/a.zip");
        assert_eq!(extract_archive(path), path);
    }
}
