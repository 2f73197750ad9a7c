//! Chainable web scraping: filter nodes, select values, follow links.
//!
//! A [`Scraper`] fetches a root document, then lets a query chain narrow a
//! working set of nodes with CSS selectors ([`Scraper::filter`]), extract
//! named text or attribute values from them ([`Scraper::select`]) and pivot
//! into the documents behind matched hyperlinks ([`Scraper::follow`]).
//! [`Scraper::done`] collapses everything extracted anywhere in the chain,
//! linked pages included, into one ordered list of records.
//!
//! ```ignore
//! use websift::Scraper;
//!
//! let records = Scraper::get("https://blog.example.com/")
//!     .filter(".post")
//!     .select(&[("title", "h2"), ("link", "h2 a[href]")])
//!     .follow("h2 a[href]")
//!     .select(&[("body", "article")])
//!     .done()?;
//! ```
//!
//! Data sources are pluggable through the [`Getter`] trait; [`MemoryGetter`]
//! and [`FileGetter`] serve fixtures in tests, and the default [`HttpGetter`]
//! speaks blocking HTTP with relative-URL resolution via [`UrlResolver`].
//! Progress is reported as `tracing` events; install a subscriber to see it.

mod diagnostics;
mod engine;
mod error;
mod getter;
mod node;

pub use diagnostics::TraceGetter;
pub use engine::{Scraper, ScraperBuilder};
pub use error::{FetchError, ScrapeError};
pub use getter::{
    resolve_url, FileGetter, Getter, HttpGetter, MemoryGetter, UrlResolver, UserAgentPool,
};
pub use node::Record;
