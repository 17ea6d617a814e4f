//! Best-effort remote archive harvesting.
//!
//! The crawler paginates an HTTP listing page, sizes each linked archive
//! with a HEAD request, and streams the ones a caller-supplied predicate
//! accepts; the downloader persists them under a target directory. Every
//! network failure is logged and skipped; a bad link never aborts the
//! crawl. The search core knows nothing about any of this beyond the
//! resulting directory, which can be handed to [`crate::search`] as the
//! root.

mod extract;

pub use extract::extract_archive;

use crossbeam_channel::{bounded, Receiver, Sender};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::Url;
use std::fs::File;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info, warn};

use crate::errors::{SearchError, SearchResult};

const LISTING_QUEUE_CAPACITY: usize = 8;
const DOWNLOAD_QUEUE_CAPACITY: usize = 4;

const HREF_PATTERN: &str = r#"href\s*=\s*["']([^"']+)["']"#;

/// Decides per archive whether it is worth downloading.
pub type SizePredicate = Box<dyn Fn(&str, f64) -> bool + Send>;

/// An archive discovered on the listing, not yet fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile {
    pub url: String,
    pub size_mb: f64,
}

/// An archive persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub url: String,
    pub local_path: PathBuf,
}

/// Paginates an HTTP listing and streams the archives worth fetching.
pub struct Crawler {
    start: String,
    download_if: SizePredicate,
    client: Client,
}

impl Crawler {
    pub fn new(start: impl Into<String>, download_if: SizePredicate) -> Self {
        Crawler {
            start: start.into(),
            download_if,
            client: Client::new(),
        }
    }

    /// Starts the crawl on a producer thread. The receiver closes when the
    /// listing runs out of pages or the crawl gives up.
    pub fn run(self) -> Receiver<RemoteFile> {
        let (tx, rx) = bounded(LISTING_QUEUE_CAPACITY);
        thread::Builder::new()
            .name("linescout-crawl".to_string())
            .spawn(move || self.crawl(tx))
            .ok();
        rx
    }

    fn crawl(self, tx: Sender<RemoteFile>) {
        let href_re = match Regex::new(HREF_PATTERN) {
            Ok(re) => re,
            Err(e) => {
                warn!("bad href pattern: {}", e);
                return;
            }
        };
        let mut page = match Url::parse(&self.start) {
            Ok(url) => url,
            Err(e) => {
                warn!("bad start url {}: {}", self.start, e);
                return;
            }
        };

        loop {
            debug!("fetching listing page {}", page);
            let body = match self.fetch_page(&page) {
                Ok(body) => body,
                Err(e) => {
                    warn!("listing page {} failed: {}", page, e);
                    return;
                }
            };

            let links = listing_links(&href_re, &body);
            for href in &links.archives {
                let Some(target) = absolutize(&page, href) else {
                    continue;
                };
                let Some(size_mb) = self.head_size(target.as_str()) else {
                    continue;
                };
                if !(self.download_if)(target.as_str(), size_mb) {
                    debug!("predicate rejected {} ({:.2}MB)", target, size_mb);
                    continue;
                }
                let file = RemoteFile {
                    url: target.into(),
                    size_mb,
                };
                if tx.send(file).is_err() {
                    // Consumer went away; stop paginating.
                    return;
                }
            }

            match links.next.as_deref().and_then(|next| absolutize(&page, next)) {
                Some(next) => page = next,
                None => return,
            }
        }
    }

    fn fetch_page(&self, page: &Url) -> SearchResult<String> {
        let body = self
            .client
            .get(page.clone())
            .send()?
            .error_for_status()?
            .text()?;
        Ok(body)
    }

    /// Sizes an archive with a HEAD request; `None` means unusable link.
    fn head_size(&self, url: &str) -> Option<f64> {
        let response = match self.client.head(url).send() {
            Ok(r) => r,
            Err(e) => {
                warn!("HEAD {} failed: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("HEAD {} returned {}", url, response.status());
            return None;
        }
        let length = response.content_length()?;
        Some(length as f64 / (1024.0 * 1024.0))
    }
}

/// Links extracted from one listing page.
#[derive(Debug, Default, PartialEq, Eq)]
struct ListingLinks {
    /// hrefs ending in `.zip`
    archives: Vec<String>,
    /// Pagination link (`offset=` in the href), if the page has one
    next: Option<String>,
}

fn listing_links(href_re: &Regex, body: &str) -> ListingLinks {
    let mut links = ListingLinks::default();
    for capture in href_re.captures_iter(body) {
        let href = &capture[1];
        if href.ends_with(".zip") {
            links.archives.push(href.to_string());
        } else if href.contains("offset=") {
            links.next = Some(href.to_string());
        }
    }
    links
}

/// Resolves an href against the page it came from.
fn absolutize(page: &Url, href: &str) -> Option<Url> {
    match page.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("unresolvable href {}: {}", href, e);
            None
        }
    }
}

/// Streams crawler-accepted archives to disk.
pub struct Downloader {
    target_dir: PathBuf,
    client: Client,
}

impl Downloader {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Downloader {
            target_dir: target_dir.into(),
            client: Client::new(),
        }
    }

    /// Fetches files as they come off the crawler, skipping failures. The
    /// receiver closes when the input does.
    pub fn run(self, files: Receiver<RemoteFile>) -> Receiver<DownloadedFile> {
        let (tx, rx) = bounded(DOWNLOAD_QUEUE_CAPACITY);
        thread::Builder::new()
            .name("linescout-download".to_string())
            .spawn(move || {
                for file in files {
                    match self.fetch(&file) {
                        Ok(downloaded) => {
                            info!(
                                "downloaded {} to {} ({:.2}MB)",
                                downloaded.url,
                                downloaded.local_path.display(),
                                file.size_mb
                            );
                            if tx.send(downloaded).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("download of {} failed, skipping: {}", file.url, e),
                    }
                }
            })
            .ok();
        rx
    }

    /// Downloads one archive into the target directory.
    pub fn fetch(&self, file: &RemoteFile) -> SearchResult<DownloadedFile> {
        let name = archive_file_name(&file.url)
            .ok_or_else(|| SearchError::harvest_error(&file.url, "url has no file name"))?;
        std::fs::create_dir_all(&self.target_dir)?;
        let local_path = self.target_dir.join(name);

        let mut response = self.client.get(&file.url).send()?.error_for_status()?;
        let mut out = File::create(&local_path)?;
        std::io::copy(&mut response, &mut out)?;

        Ok(DownloadedFile {
            url: file.url.clone(),
            local_path,
        })
    }
}

/// Last path segment of an archive url, used as the on-disk name.
fn archive_file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn href_regex() -> Regex {
        Regex::new(HREF_PATTERN).unwrap()
    }

    #[test]
    fn test_listing_links_extraction() {
        let body = r#"
            <a href="files/one.zip">one</a>
            <a href='files/two.zip'>two</a>
            <a href="readme.html">docs</a>
            <a href="harvest?offset=42">next</a>
        "#;
        let links = listing_links(&href_regex(), body);
        assert_eq!(links.archives, vec!["files/one.zip", "files/two.zip"]);
        assert_eq!(links.next.as_deref(), Some("harvest?offset=42"));
    }

    #[test]
    fn test_listing_without_next_page() {
        let body = r#"<a href="last.zip">last</a>"#;
        let links = listing_links(&href_regex(), body);
        assert_eq!(links.archives, vec!["last.zip"]);
        assert_eq!(links.next, None);
    }

    #[test]
    fn test_absolutize_relative_and_absolute() {
        let page = Url::parse("http://example.com/robot/harvest").unwrap();
        assert_eq!(
            absolutize(&page, "files/a.zip").unwrap().as_str(),
            "http://example.com/robot/files/a.zip"
        );
        assert_eq!(
            absolutize(&page, "http://mirror.example.com/b.zip")
                .unwrap()
                .as_str(),
            "http://mirror.example.com/b.zip"
        );
        assert_eq!(
            absolutize(&page, "harvest?offset=10").unwrap().as_str(),
            "http://example.com/robot/harvest?offset=10"
        );
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            archive_file_name("http://example.com/files/a.zip").as_deref(),
            Some("a.zip")
        );
        assert_eq!(archive_file_name("http://example.com/"), None);
        assert_eq!(archive_file_name("not a url"), None);
    }
}
