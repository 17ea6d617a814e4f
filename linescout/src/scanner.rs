//! Per-file content scanning.
//!
//! A scan owns its file handle for exactly one file: the handle is opened
//! here and closed on every exit path, whether the file ends, an I/O error
//! interrupts the read, or the pipeline is cancelled mid-file. Failure to
//! open or read is always local to the file; the pipeline keeps going.

use crossbeam_channel::{select, Sender};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::results::{MatchResult, ScanStats};

/// Bytes sniffed from the head of a file to decide text vs binary.
const SNIFF_BYTES: usize = 1024;

/// Cap on the bytes of a single line kept in memory. A longer line is
/// truncated to this prefix and the remainder discarded, so a file with one
/// enormous line costs bounded memory instead of crashing the worker. The
/// truncated prefix still participates in matching.
pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

const BUFFER_CAPACITY: usize = 8192;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ScanOutcome {
    /// The file was fully handled (scanned, skipped, or abandoned on a
    /// local error).
    Completed,
    /// The pipeline is shutting down; the worker should stop pulling work.
    Cancelled,
}

/// Scans one file, streaming each trimmed matching line into `out` in
/// on-disk order.
pub(crate) fn scan_file(
    path: &Path,
    query: &str,
    out: &Sender<MatchResult>,
    cancel: &CancelToken,
    stats: &ScanStats,
) -> ScanOutcome {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!("skipping {}: {}", path.display(), e);
            stats.record_skipped();
            return ScanOutcome::Completed;
        }
    };

    // Best-effort content sniff: a NUL byte in the first chunk means the
    // file is treated as binary and skipped without a line scan. False
    // positives and negatives are acceptable for this heuristic.
    let mut probe = vec![0u8; SNIFF_BYTES];
    let probe_len = match file.read(&mut probe) {
        Ok(n) => n,
        Err(e) => {
            warn!("skipping {}: {}", path.display(), e);
            stats.record_skipped();
            return ScanOutcome::Completed;
        }
    };
    probe.truncate(probe_len);
    if probe.contains(&0) {
        debug!("skipping binary content: {}", path.display());
        stats.record_scanned();
        return ScanOutcome::Completed;
    }

    // Replay the sniffed bytes ahead of the rest of the file.
    let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, Cursor::new(probe).chain(file));
    let mut buf = Vec::with_capacity(256);

    loop {
        if cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }
        buf.clear();
        match read_line_capped(&mut reader, &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("abandoning {} mid-read: {}", path.display(), e);
                stats.record_skipped();
                return ScanOutcome::Completed;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if !trimmed.contains(query) {
            continue;
        }

        trace!("match in {}: {}", path.display(), trimmed);
        let result = MatchResult {
            query: query.to_string(),
            line: trimmed.to_string(),
            path: path.to_path_buf(),
        };
        select! {
            send(out, result) -> sent => {
                if sent.is_err() {
                    return ScanOutcome::Cancelled;
                }
            }
            recv(cancel.channel()) -> _ => {
                return ScanOutcome::Cancelled;
            }
        }
        stats.record_match();
    }

    stats.record_scanned();
    ScanOutcome::Completed
}

/// Reads one newline-delimited line into `buf`, keeping at most
/// [`MAX_LINE_BYTES`] of it. Returns the number of bytes kept; `Ok(0)`
/// means end of file.
fn read_line_capped<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let n = reader
        .by_ref()
        .take(MAX_LINE_BYTES as u64)
        .read_until(b'\n', buf)?;
    if n == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
        trace!("line exceeds {} bytes, truncating", MAX_LINE_BYTES);
        discard_to_newline(reader)?;
    }
    Ok(n)
}

/// Consumes the remainder of an over-long line without buffering it.
fn discard_to_newline<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (skip, done) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                (0, true)
            } else if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                (pos + 1, true)
            } else {
                (available.len(), false)
            }
        };
        reader.consume(skip);
        if done {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::tempdir;

    fn collect_matches(path: &Path, query: &str) -> (Vec<MatchResult>, ScanStats) {
        let (tx, rx) = bounded(1024);
        let token = CancelToken::new();
        let stats = ScanStats::default();
        let outcome = scan_file(path, query, &tx, &token, &stats);
        assert_eq!(outcome, ScanOutcome::Completed);
        drop(tx);
        (rx.iter().collect(), stats)
    }

    #[test]
    fn test_matches_are_trimmed_and_ordered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "  hello world  ").unwrap();
        writeln!(file, "nothing here").unwrap();
        writeln!(file, "\thello again").unwrap();
        drop(file);

        let (matches, _) = collect_matches(&path, "hello");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].line, "hello world");
        assert_eq!(matches[1].line, "hello again");
        assert!(matches.iter().all(|m| m.query == "hello" && m.path == path));
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        let (matches, stats) = collect_matches(&path, "hello");
        assert!(matches.is_empty());
        assert_eq!(stats.snapshot(Duration::ZERO).files_skipped, 1);
    }

    #[test]
    fn test_binary_content_not_scanned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.dat");
        std::fs::write(&path, b"hello\x00world\nhello\n").unwrap();

        let (matches, _) = collect_matches(&path, "hello");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_final_line_without_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "first hello\nlast hello").unwrap();

        let (matches, _) = collect_matches(&path, "hello");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].line, "last hello");
    }

    #[test]
    fn test_cancel_mid_file_stops_scan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let mut file = File::create(&path).unwrap();
        for _ in 0..100 {
            writeln!(file, "hello").unwrap();
        }
        drop(file);

        // Capacity one and no consumer: the second send must block, and the
        // cancel arm has to win the race.
        let (tx, rx) = bounded(1);
        let token = CancelToken::new();
        let stats = ScanStats::default();
        token.cancel(crate::cancel::CancelReason::UserAbort);
        let outcome = scan_file(&path, "hello", &tx, &token, &stats);
        assert_eq!(outcome, ScanOutcome::Cancelled);
        drop(tx);
        assert!(rx.iter().count() <= 1);
    }

    #[test]
    fn test_long_line_truncated_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.txt");
        let mut file = File::create(&path).unwrap();
        let huge = "x".repeat(MAX_LINE_BYTES * 2);
        writeln!(file, "hello {}", huge).unwrap();
        writeln!(file, "trailing hello").unwrap();
        drop(file);

        let (matches, _) = collect_matches(&path, "hello");
        // The huge line still matches on its kept prefix, and the line
        // after it is read correctly.
        assert_eq!(matches.len(), 2);
        assert!(matches[0].line.len() <= MAX_LINE_BYTES);
        assert_eq!(matches[1].line, "trailing hello");
    }

    #[test]
    fn test_read_line_capped_boundaries() {
        let data = b"short\n".to_vec();
        let mut reader = BufReader::new(Cursor::new(data));
        let mut buf = Vec::new();
        assert_eq!(read_line_capped(&mut reader, &mut buf).unwrap(), 6);
        buf.clear();
        assert_eq!(read_line_capped(&mut reader, &mut buf).unwrap(), 0);
    }
}
