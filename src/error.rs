//! Error types for chain evaluation and document fetching
//!
//! Two layers of failure exist: [`FetchError`] covers the data-source side
//! (a URL that cannot be retrieved), while [`ScrapeError`] covers everything
//! a query chain can die of. A `ScrapeError` reported by
//! [`Scraper::done`](crate::Scraper::done) is always the *first* hard failure
//! encountered in the chain; later steps after a failure never run.

/// Errors that abort a query chain
///
/// Once any of these occurs, the owning [`Scraper`](crate::Scraper) is
/// poisoned: every later chain call is a no-op and `done()` returns the
/// stored error.
///
/// # Examples
///
/// ```ignore
/// match Scraper::get(url).filter("div[").done() {
///     Err(ScrapeError::InvalidSelector { selector, .. }) => {
///         eprintln!("bad selector: {selector}");
///     }
///     other => println!("{other:?}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// A CSS selector string failed to compile
    ///
    /// Raised by `filter`, `select` and `follow`, which each compile their
    /// selector once per chain call.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The initial document could not be retrieved
    ///
    /// Only the root fetch is a hard failure; fetch failures while following
    /// links are skipped per target instead.
    #[error("failed to fetch '{url}'")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A fetched stream could not be read into a document
    ///
    /// Malformed markup never lands here (the HTML parser recovers on its
    /// own); this is an unreadable or non-UTF-8 byte stream.
    #[error("failed to read document from '{url}'")]
    Parse {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// A selector with an attribute suffix matched an element without that
    /// attribute
    ///
    /// Raised only by `select`; `follow` skips such targets silently.
    #[error("no attribute '{attr}' on element matched by '{selector}'")]
    MissingAttribute { selector: String, attr: String },
}

/// Errors produced by a [`Getter`](crate::Getter) implementation
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The data source has nothing for this URL
    #[error("no data for url '{0}'")]
    NotFound(String),

    /// An HTTP request could not be built or sent
    #[error("request for '{url}' failed: {message}")]
    Http { url: String, message: String },

    /// The server answered with a non-success status
    #[error("request for '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    /// A filesystem-backed source failed to open its file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
