//! Data-source abstraction for the query engine
//!
//! A [`Getter`] turns a URL into a readable byte stream. Three sources ship
//! with the crate: [`MemoryGetter`] (string map, the test workhorse),
//! [`FileGetter`] (url-to-path map) and [`HttpGetter`] (blocking HTTP with a
//! rotating user-agent header). [`UrlResolver`] decorates any of them with
//! standard relative-reference resolution against the referring document.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use url::Url;

use crate::error::FetchError;

/// Capability of resolving a URL, with an optional referring URL, to a byte
/// stream
///
/// Implementations must be shareable across chains a caller runs in
/// parallel, hence the `Send + Sync` bound. The referer is `Some` only when
/// the engine follows a link out of a document; whether and how it is honored
/// is up to the implementation (see [`UrlResolver`]).
pub trait Getter: Send + Sync {
    /// Retrieve the content behind `url`
    ///
    /// # Arguments
    /// * `url` - The target, possibly relative
    /// * `referer` - URL of the document the target was found in, if any
    fn get(&self, url: &str, referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError>;
}

impl<G: Getter + ?Sized> Getter for Arc<G> {
    fn get(&self, url: &str, referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        (**self).get(url, referer)
    }
}

/// In-memory [`Getter`] serving pages from a url-to-body map
///
/// # Examples
///
/// ```ignore
/// let getter = MemoryGetter::new()
///     .page("http://test", "<div class='d'>hello</div>");
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryGetter {
    pages: HashMap<String, String>,
}

impl MemoryGetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page body under a URL, consuming and returning the getter
    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

impl Getter for MemoryGetter {
    fn get(&self, url: &str, _referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        let body = self
            .pages
            .get(url)
            .ok_or_else(|| FetchError::NotFound(url.to_owned()))?;
        Ok(Box::new(Cursor::new(body.clone().into_bytes())))
    }
}

/// File-backed [`Getter`] mapping URLs to paths on disk
#[derive(Debug, Default, Clone)]
pub struct FileGetter {
    files: HashMap<String, PathBuf>,
}

impl FileGetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file path under a URL, consuming and returning the getter
    pub fn file(mut self, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(url.into(), path.into());
        self
    }
}

impl Getter for FileGetter {
    fn get(&self, url: &str, _referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        let path = self
            .files
            .get(url)
            .ok_or_else(|| FetchError::NotFound(url.to_owned()))?;
        let file = File::open(path)?;
        Ok(Box::new(file))
    }
}

/// Round-robin pool of user-agent strings
///
/// The cursor is atomic so one pool can serve concurrent chains. An empty
/// pool yields the empty string, which [`HttpGetter`] treats as "send no
/// user-agent header".
#[derive(Debug, Default)]
pub struct UserAgentPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    pub fn new<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agents: agents.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next agent in rotation
    pub fn next_agent(&self) -> &str {
        if self.agents.is_empty() {
            return "";
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.agents[index % self.agents.len()]
    }
}

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

/// Blocking HTTP [`Getter`]
///
/// Sends a GET per request with the next user agent from its pool and a
/// client-side timeout. Non-success statuses are reported as
/// [`FetchError::Status`].
pub struct HttpGetter {
    client: reqwest::blocking::Client,
    agents: UserAgentPool,
}

impl HttpGetter {
    pub fn new() -> Self {
        Self::with_agents([DEFAULT_USER_AGENT])
    }

    /// Build a getter rotating over the given user-agent strings
    pub fn with_agents<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            agents: UserAgentPool::new(agents),
        }
    }
}

impl Default for HttpGetter {
    fn default() -> Self {
        Self::new()
    }
}

impl Getter for HttpGetter {
    fn get(&self, url: &str, _referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        let mut request = self.client.get(url);
        let agent = self.agents.next_agent();
        if !agent.is_empty() {
            request = request.header(USER_AGENT, agent);
        }
        let response = request.send().map_err(|err| FetchError::Http {
            url: url.to_owned(),
            message: err.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: response.status().as_u16(),
            });
        }
        Ok(Box::new(response))
    }
}

/// Decorator applying relative-reference resolution before delegating
///
/// With a non-empty referer the target is joined onto it per standard URL
/// resolution and the inner getter sees the absolute result with the referer
/// cleared; otherwise the call passes through untouched. The default HTTP
/// getter ships wrapped in this.
#[derive(Debug, Clone)]
pub struct UrlResolver<G> {
    inner: G,
}

impl<G> UrlResolver<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<G: Getter> Getter for UrlResolver<G> {
    fn get(&self, url: &str, referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        match referer {
            Some(base) if !base.is_empty() => {
                let resolved = resolve_url(url, base);
                self.inner.get(&resolved, None)
            }
            _ => self.inner.get(url, None),
        }
    }
}

/// Resolve `url` against `base` per standard URL-reference resolution
///
/// Falls back to `url` unchanged when the base does not parse as an absolute
/// URL or the join fails.
pub fn resolve_url(url: &str, base: &str) -> String {
    let Ok(base) = Url::parse(base) else {
        return url.to_owned();
    };
    match base.join(url) {
        Ok(resolved) => resolved.into(),
        Err(_) => url.to_owned(),
    }
}
