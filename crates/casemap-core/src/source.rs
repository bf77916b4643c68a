//! Read-only content store access.
//!
//! Two resources exist per selection:
//!
//! ```text
//! cases/{version}/_index.md        canonical test-plan markdown (required)
//! results/{version}/{user}.json    status file for one tester (optional)
//! ```
//!
//! Sources report an absent status file as `Ok(None)`. Turning errors into
//! fallbacks is the caller's decision, not the source's.

use std::cell::Cell;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::merge::CANONICAL_FILE;

/// Errors from the fetch boundary.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A version or user value cannot be used as a single path segment.
    #[error("invalid {kind} '{value}'")]
    InvalidSegment { kind: &'static str, value: String },

    /// The resource does not exist.
    #[error("{location} not found")]
    NotFound { location: String },

    /// The server answered with a non-success status.
    #[error("{location} returned status {code}")]
    Status { code: u16, location: String },

    /// Connection, TLS, or body decoding failure.
    #[error("request to {location} failed: {message}")]
    Transport { location: String, message: String },

    /// Local filesystem failure.
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
}

/// Reject values that are not a single, URL-safe path segment.
///
/// Only ASCII letters, digits, `-`, `_` and `.` are allowed, so a value can be
/// placed in a URL or a path without encoding.
///
/// # Errors
///
/// Returns [`FetchError::InvalidSegment`] for empty values, values holding
/// `..`, or any other character.
pub fn validate_segment(kind: &'static str, value: &str) -> Result<(), FetchError> {
    let bad = value.is_empty()
        || value.contains("..")
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if bad {
        return Err(FetchError::InvalidSegment {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn document_path(version: &str) -> String {
    format!("cases/{version}/{CANONICAL_FILE}")
}

fn results_path(version: &str, user: &str) -> String {
    format!("results/{version}/{user}.json")
}

/// Where test plans and status files are read from.
pub trait ContentSource {
    /// Fetch the canonical markdown for `version`.
    fn fetch_document(&self, version: &str) -> impl Future<Output = Result<String, FetchError>>;

    /// Fetch the raw status file for `(version, user)`; `None` when absent.
    fn fetch_results(
        &self,
        version: &str,
        user: &str,
    ) -> impl Future<Output = Result<Option<String>, FetchError>>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Content store served over HTTP, e.g. a static site.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    cache_bust: bool,
    agent: ureq::Agent,
}

impl HttpSource {
    #[must_use]
    pub fn new(base_url: impl Into<String>, cache_bust: bool, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent("casemap")
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache_bust,
            agent,
        }
    }

    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if self.cache_bust {
            let stamp = chrono::Utc::now().timestamp_millis();
            format!("{}/{path}?cache_bust={stamp}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn get(&self, url: String) -> Result<Option<String>, FetchError> {
        let agent = self.agent.clone();
        let location = url.clone();
        debug!(url = %url, "fetching");

        let joined = tokio::task::spawn_blocking(move || match agent.get(&url).call() {
            Ok(response) => response
                .into_string()
                .map(Some)
                .map_err(|err| FetchError::Transport {
                    location: url.clone(),
                    message: err.to_string(),
                }),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, _)) => Err(FetchError::Status {
                code,
                location: url.clone(),
            }),
            Err(err) => Err(FetchError::Transport {
                location: url.clone(),
                message: err.to_string(),
            }),
        })
        .await;

        joined.map_err(|err| FetchError::Transport {
            location,
            message: err.to_string(),
        })?
    }
}

impl ContentSource for HttpSource {
    async fn fetch_document(&self, version: &str) -> Result<String, FetchError> {
        validate_segment("version", version)?;
        let url = self.url_for(&document_path(version));
        self.get(url.clone())
            .await?
            .ok_or(FetchError::NotFound { location: url })
    }

    async fn fetch_results(&self, version: &str, user: &str) -> Result<Option<String>, FetchError> {
        validate_segment("version", version)?;
        validate_segment("user", user)?;
        self.get(self.url_for(&results_path(version, user))).await
    }
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

/// Content store laid out on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, relative: &str) -> Result<Option<String>, FetchError> {
        let path = self.root.join(relative);
        debug!(path = %path.display(), "reading");
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FetchError::Io {
                location: path.display().to_string(),
                source,
            }),
        }
    }
}

impl ContentSource for DirSource {
    async fn fetch_document(&self, version: &str) -> Result<String, FetchError> {
        validate_segment("version", version)?;
        let relative = document_path(version);
        self.read(&relative).await?.ok_or_else(|| FetchError::NotFound {
            location: self.root.join(&relative).display().to_string(),
        })
    }

    async fn fetch_results(&self, version: &str, user: &str) -> Result<Option<String>, FetchError> {
        validate_segment("version", version)?;
        validate_segment("user", user)?;
        self.read(&results_path(version, user)).await
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// In-memory content store with fetch counters.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: HashMap<String, String>,
    results: HashMap<(String, String), String>,
    document_fetches: Cell<usize>,
    result_fetches: Cell<usize>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(mut self, version: &str, markdown: &str) -> Self {
        self.documents
            .insert(version.to_string(), markdown.to_string());
        self
    }

    #[must_use]
    pub fn with_results(mut self, version: &str, user: &str, raw: &str) -> Self {
        self.results
            .insert((version.to_string(), user.to_string()), raw.to_string());
        self
    }

    /// Number of document fetches issued so far.
    #[must_use]
    pub fn document_fetches(&self) -> usize {
        self.document_fetches.get()
    }

    /// Number of status-file fetches issued so far.
    #[must_use]
    pub fn result_fetches(&self) -> usize {
        self.result_fetches.get()
    }

    /// Total fetches across both resources.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.document_fetches() + self.result_fetches()
    }
}

impl ContentSource for MemorySource {
    async fn fetch_document(&self, version: &str) -> Result<String, FetchError> {
        self.document_fetches.set(self.document_fetches.get() + 1);
        tokio::task::yield_now().await;
        self.documents
            .get(version)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                location: document_path(version),
            })
    }

    async fn fetch_results(&self, version: &str, user: &str) -> Result<Option<String>, FetchError> {
        self.result_fetches.set(self.result_fetches.get() + 1);
        tokio::task::yield_now().await;
        Ok(self
            .results
            .get(&(version.to_string(), user.to_string()))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Any of the supported content stores.
#[derive(Debug)]
pub enum Source {
    Http(HttpSource),
    Dir(DirSource),
    Memory(MemorySource),
}

impl Source {
    /// Pick HTTP for `http://`/`https://` locations and a local directory
    /// otherwise.
    #[must_use]
    pub fn from_location(location: &str, cache_bust: bool, timeout: Duration) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Http(HttpSource::new(location, cache_bust, timeout))
        } else {
            Self::Dir(DirSource::new(location))
        }
    }
}

impl ContentSource for Source {
    async fn fetch_document(&self, version: &str) -> Result<String, FetchError> {
        match self {
            Self::Http(source) => source.fetch_document(version).await,
            Self::Dir(source) => source.fetch_document(version).await,
            Self::Memory(source) => source.fetch_document(version).await,
        }
    }

    async fn fetch_results(&self, version: &str, user: &str) -> Result<Option<String>, FetchError> {
        match self {
            Self::Http(source) => source.fetch_results(version, user).await,
            Self::Dir(source) => source.fetch_results(version, user).await,
            Self::Memory(source) => source.fetch_results(version, user).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn segment_validation_rejects_traversal() {
        assert!(validate_segment("version", "v1.0.0").is_ok());
        assert!(validate_segment("user", "alice_qa").is_ok());
        assert!(validate_segment("version", "").is_err());
        assert!(validate_segment("version", "../secret").is_err());
        assert!(validate_segment("user", "a/b").is_err());
        assert!(validate_segment("user", "a\\b").is_err());
    }

    #[test]
    fn segment_validation_rejects_url_reserved_characters() {
        for value in ["qa#1", "qa?x=1", "qa 1", "qa%20", "qa&b", " alice"] {
            assert!(
                matches!(
                    validate_segment("user", value),
                    Err(FetchError::InvalidSegment { kind: "user", .. })
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn http_urls_carry_cache_bust_when_enabled() {
        let source = HttpSource::new("https://example.test/plans/", true, Duration::from_secs(1));
        let url = source.url_for(&document_path("v1"));
        assert!(url.starts_with("https://example.test/plans/cases/v1/_index.md?cache_bust="));

        let plain = HttpSource::new("https://example.test", false, Duration::from_secs(1));
        assert_eq!(
            plain.url_for(&results_path("v1", "alice")),
            "https://example.test/results/v1/alice.json"
        );
    }

    #[test]
    fn location_picks_source_kind() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            Source::from_location("https://x.test", true, timeout),
            Source::Http(_)
        ));
        assert!(matches!(
            Source::from_location("./site", true, timeout),
            Source::Dir(_)
        ));
    }

    #[tokio::test]
    async fn dir_source_reads_layout_and_reports_absent_results() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("cases/v1")).expect("cases dir");
        fs::write(temp.path().join("cases/v1/_index.md"), "# v1").expect("index");
        fs::create_dir_all(temp.path().join("results/v1")).expect("results dir");
        fs::write(temp.path().join("results/v1/alice.json"), "{}").expect("results");

        let source = DirSource::new(temp.path());
        assert_eq!(source.fetch_document("v1").await.expect("doc"), "# v1");
        assert_eq!(
            source.fetch_results("v1", "alice").await.expect("alice"),
            Some("{}".to_string())
        );
        assert_eq!(source.fetch_results("v1", "bob").await.expect("bob"), None);
        assert!(matches!(
            source.fetch_document("v2").await,
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            source.fetch_results("v1", "../alice").await,
            Err(FetchError::InvalidSegment { kind: "user", .. })
        ));
    }

    #[tokio::test]
    async fn http_source_refuses_reserved_user_names_before_requesting() {
        let source = HttpSource::new("http://127.0.0.1:9", false, Duration::from_millis(50));
        assert!(matches!(
            source.fetch_results("v1", "qa#1").await,
            Err(FetchError::InvalidSegment { kind: "user", .. })
        ));
    }

    #[tokio::test]
    async fn memory_source_counts_fetches() {
        let source = MemorySource::new()
            .with_document("v1", "- [A-1] a")
            .with_results("v1", "alice", "{}");

        assert!(source.fetch_document("v1").await.is_ok());
        assert!(source.fetch_document("v9").await.is_err());
        assert_eq!(
            source.fetch_results("v1", "alice").await.expect("results"),
            Some("{}".to_string())
        );
        assert_eq!(source.document_fetches(), 2);
        assert_eq!(source.result_fetches(), 1);
        assert_eq!(source.total_fetches(), 3);
    }
}
