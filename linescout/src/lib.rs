//! Streaming, concurrent recursive text search.
//!
//! A search run is a fan-out/fan-in pipeline: one walker thread turns a
//! directory tree into admissible file paths, a pool of scanner workers
//! turns paths into matched lines, and the caller drains a single bounded
//! result channel as matches are found. See [`search`] for the entry
//! point and [`pipeline`] for the orchestration details.
//!
//! The `harvest` module is an out-of-core collaborator: a best-effort
//! crawler/downloader that can populate a directory which is then handed
//! to [`search`] as the root.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod filters;
pub mod harvest;
pub mod pipeline;
pub mod results;
mod scanner;
mod walker;

pub use cancel::{CancelReason, CancelToken};
pub use config::SearchOptions;
pub use errors::{SearchError, SearchResult};
pub use pipeline::{search, SearchStream};
pub use results::{MatchResult, ScanSummary};
