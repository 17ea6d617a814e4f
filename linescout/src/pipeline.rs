//! The producer/filter/consumer pipeline.
//!
//! One walker thread feeds a bounded path channel; a pool of scanner
//! workers pulls paths and pushes matches into a bounded result channel;
//! the caller drains the result side through [`SearchStream`]. The bounded
//! capacities are the backpressure mechanism: a slow consumer stalls the
//! scanners, which stalls the walker, so memory stays O(channel capacity)
//! no matter how large the tree is.
//!
//! The output closes only after the walk has finished and every dispatched
//! scan has completed. That barrier is the sender reference count itself:
//! each worker owns a clone of the result sender and drops it on exit, so
//! closing the channel while a worker could still write to it is
//! structurally impossible.

use crossbeam_channel::{after, bounded, select, Receiver, Sender};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info};

use crate::cancel::{CancelReason, CancelToken};
use crate::config::SearchOptions;
use crate::errors::{SearchError, SearchResult};
use crate::filters::FilterPolicy;
use crate::results::{MatchResult, ScanStats, ScanSummary};
use crate::scanner::{self, ScanOutcome};
use crate::walker;

/// Capacity of the walk -> scan channel.
const PATH_QUEUE_CAPACITY: usize = 128;

/// Capacity of the scan -> caller channel.
const RESULT_QUEUE_CAPACITY: usize = 64;

/// Starts a search and returns the live result stream.
///
/// Configuration problems (zero concurrency, invalid include regex,
/// zero timeout) are reported here, before any thread is spawned. After
/// that, the only error the run can end with is cancellation; per-file
/// failures are logged and counted, never surfaced as errors.
pub fn search(options: SearchOptions) -> SearchResult<SearchStream> {
    options.validate()?;
    let policy = FilterPolicy::from_options(&options)?;

    info!(
        "searching for {:?} under {} with {} workers",
        options.query,
        options.root.display(),
        options.concurrency
    );

    let token = CancelToken::new();
    let stats = Arc::new(ScanStats::default());
    let started = Instant::now();

    let (path_tx, path_rx) = bounded::<PathBuf>(PATH_QUEUE_CAPACITY);
    let (result_tx, result_rx) = bounded::<MatchResult>(RESULT_QUEUE_CAPACITY);
    let (done_tx, done_rx) = bounded::<()>(0);

    let mut handles = Vec::with_capacity(options.concurrency + 2);

    {
        let token = token.clone();
        let stats = Arc::clone(&stats);
        handles.push(
            thread::Builder::new()
                .name("linescout-walk".to_string())
                .spawn(move || walker::walk(&policy, path_tx, token, stats))?,
        );
    }

    for id in 0..options.concurrency {
        let path_rx = path_rx.clone();
        let result_tx = result_tx.clone();
        let token = token.clone();
        let stats = Arc::clone(&stats);
        let query = options.query.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("linescout-scan-{}", id))
                .spawn(move || scan_loop(&query, path_rx, result_tx, token, stats))?,
        );
    }
    // The workers now hold the only sender clones; the channel disconnects
    // when the last of them exits.
    drop(path_rx);
    drop(result_tx);

    if let Some(timeout) = options.timeout {
        let token = token.clone();
        handles.push(
            thread::Builder::new()
                .name("linescout-deadline".to_string())
                .spawn(move || {
                    select! {
                        recv(after(timeout)) -> _ => {
                            debug!("deadline of {:?} reached", timeout);
                            token.cancel(CancelReason::Timeout);
                        }
                        recv(done_rx) -> _ => {}
                    }
                })?,
        );
    }

    Ok(SearchStream {
        rx: result_rx,
        token,
        stats,
        started,
        handles,
        done_tx: Some(done_tx),
        finished: false,
    })
}

fn scan_loop(
    query: &str,
    path_rx: Receiver<PathBuf>,
    result_tx: Sender<MatchResult>,
    token: CancelToken,
    stats: Arc<ScanStats>,
) {
    loop {
        let path = select! {
            recv(path_rx) -> msg => match msg {
                Ok(path) => path,
                // Walk finished and the queue drained.
                Err(_) => return,
            },
            recv(token.channel()) -> _ => return,
        };
        if scanner::scan_file(&path, query, &result_tx, &token, &stats) == ScanOutcome::Cancelled {
            return;
        }
    }
}

/// Live stream of [`MatchResult`] values, yielded as workers find them.
///
/// Iteration ends when the pipeline has fully drained or was cancelled;
/// call [`SearchStream::finish`] afterwards to join the worker threads and
/// learn which of the two it was. Dropping the stream instead cancels the
/// run and still joins every thread.
pub struct SearchStream {
    rx: Receiver<MatchResult>,
    token: CancelToken,
    stats: Arc<ScanStats>,
    started: Instant,
    handles: Vec<JoinHandle<()>>,
    done_tx: Option<Sender<()>>,
    finished: bool,
}

impl Iterator for SearchStream {
    type Item = MatchResult;

    fn next(&mut self) -> Option<MatchResult> {
        self.rx.recv().ok()
    }
}

impl SearchStream {
    /// Aborts the run. Results already yielded remain valid; the stream
    /// ends once in-flight sends have unwound.
    pub fn cancel(&self) {
        self.token.cancel(CancelReason::UserAbort);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for every stage to wind down, then reports either the run's
    /// summary or the cancellation that cut it short.
    pub fn finish(mut self) -> SearchResult<ScanSummary> {
        self.shutdown();
        match self.token.reason() {
            Some(reason) => Err(SearchError::Cancelled(reason)),
            None => Ok(self.stats.snapshot(self.started.elapsed())),
        }
    }

    /// Drains undelivered results, releases the watchdog, and joins all
    /// pipeline threads. Idempotent.
    fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        // Unblocks any worker still parked on a full result queue.
        while self.rx.recv().is_ok() {}
        // Disconnects the deadline watchdog's done channel.
        self.done_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for SearchStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.token.cancel(CancelReason::UserAbort);
        self.shutdown();
    }
}
