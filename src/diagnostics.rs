//! Trace-emitting decorators
//!
//! Wrappers that forward every call to an inner component and emit a
//! structured `tracing` event on the way through. They never alter what the
//! inner component returns; with no subscriber installed they cost nothing.

use std::io::Read;

use crate::error::{FetchError, ScrapeError};
use crate::getter::Getter;
use crate::node::{DocNode, NodeFactory};

/// [`Getter`] decorator logging every fetch and fetch failure
pub struct TraceGetter<G> {
    inner: G,
}

impl<G> TraceGetter<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

impl<G: Getter> Getter for TraceGetter<G> {
    fn get(&self, url: &str, referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        tracing::debug!(url, referer = referer.unwrap_or_default(), "fetching document");
        let result = self.inner.get(url, referer);
        if let Err(err) = &result {
            tracing::warn!(url, error = %err, "fetch failed");
        }
        result
    }
}

/// `NodeFactory` decorator logging every parsed document and parse failure
pub(crate) struct TraceFactory<F> {
    inner: F,
}

impl<F> TraceFactory<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: NodeFactory> NodeFactory for TraceFactory<F> {
    fn create(&self, url: &str, stream: Box<dyn Read + Send>) -> Result<DocNode, ScrapeError> {
        match self.inner.create(url, stream) {
            Ok(node) => {
                tracing::debug!(url, "parsed document");
                Ok(node)
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "failed to build document node");
                Err(err)
            }
        }
    }
}
