//! The directory-walk stage.
//!
//! Runs on its own thread and feeds admissible file paths into a bounded
//! channel. Traversal order is whatever the filesystem enumerates; callers
//! must not rely on cross-directory ordering. A failed entry (permission
//! denied, broken link) is logged and the walk continues.

use crossbeam_channel::{select, Sender};
use ignore::WalkBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::filters::{self, FilterPolicy};
use crate::results::ScanStats;

/// Walks `policy.root` depth-first and emits each admissible regular file
/// exactly once. Returns when the tree is exhausted, the consumer goes
/// away, or the token fires; dropping `out` on return closes the path
/// channel.
pub(crate) fn walk(
    policy: &FilterPolicy,
    out: Sender<PathBuf>,
    cancel: CancelToken,
    stats: Arc<ScanStats>,
) {
    let mut builder = WalkBuilder::new(&policy.root);
    // Policy is the only filter: no gitignore handling, no implicit hidden
    // rules, and symlinks are not followed.
    builder.standard_filters(false).follow_links(false);
    if policy.skip_hidden {
        builder.filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
                    && filters::is_hidden_name(entry.file_name()))
        });
    }

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("walk error, continuing: {}", e);
                continue;
            }
        };

        // Directories descend without emission; symlinks, devices and
        // sockets are dropped here.
        let is_regular = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_regular {
            continue;
        }

        let path = entry.into_path();
        if !policy.admits(&path) {
            trace!("filtered out: {}", path.display());
            continue;
        }

        select! {
            send(out, path) -> sent => {
                if sent.is_err() {
                    debug!("path channel closed, stopping walk");
                    return;
                }
            }
            recv(cancel.channel()) -> _ => {
                debug!("walk cancelled");
                return;
            }
        }
        stats.record_walked();
    }
}
