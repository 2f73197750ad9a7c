//! The chainable query engine
//!
//! [`Scraper`] holds a tree of document nodes rooted at the initial fetch and
//! a working set of positions inside that tree. Each chain call narrows,
//! annotates or pivots the working set; [`Scraper::done`] flattens every
//! record stored anywhere in the tree into one list, in document order.
//!
//! Failure handling is fail-fast: the first selector-compile, root-fetch,
//! parse or extraction error poisons the chain, later calls are no-ops, and
//! `done()` reports that first error. The one deliberate exception is
//! [`Scraper::follow`], which skips unreachable targets per link.

use std::sync::Arc;

use scraper::Selector;

use crate::diagnostics::{TraceFactory, TraceGetter};
use crate::error::ScrapeError;
use crate::getter::{Getter, HttpGetter, UrlResolver};
use crate::node::{DocFactory, DocNode, NodeFactory, Record};

/// Position of a working-set node: child indices from the root down
type NodePath = Vec<usize>;

/// A query chain over fetched documents
///
/// Built with [`Scraper::get`] or [`Scraper::builder`]. Every chain method
/// consumes the scraper and hands it back, so queries read as one expression:
///
/// ```ignore
/// let records = Scraper::get("https://example.com/")
///     .filter(".post")
///     .select(&[("title", "h2"), ("link", "a[href]")])
///     .follow("a.more[href]")
///     .select(&[("body", "article")])
///     .done()?;
/// ```
pub struct Scraper {
    factory: Box<dyn NodeFactory>,
    root: Option<DocNode>,
    working: Vec<NodePath>,
    error: Option<ScrapeError>,
}

/// Configures and launches a [`Scraper`]
///
/// # Examples
///
/// ```ignore
/// let getter = MemoryGetter::new().page("http://test", "<div class='d'>x</div>");
/// let scraper = Scraper::builder()
///     .getter(Arc::new(getter))
///     .fetch("http://test");
/// ```
#[derive(Default)]
pub struct ScraperBuilder {
    getter: Option<Arc<dyn Getter>>,
}

impl ScraperBuilder {
    /// Use a custom data source instead of the bundled HTTP getter
    pub fn getter(mut self, getter: Arc<dyn Getter>) -> Self {
        self.getter = Some(getter);
        self
    }

    /// Fetch and parse the root document, producing the query chain
    ///
    /// A fetch or parse failure here does not return an error; it poisons the
    /// chain, and `done()` reports it.
    pub fn fetch(self, url: &str) -> Scraper {
        let getter: Arc<dyn Getter> = self
            .getter
            .unwrap_or_else(|| Arc::new(UrlResolver::new(HttpGetter::new())));
        let getter: Arc<dyn Getter> = Arc::new(TraceGetter::new(getter));
        let factory = TraceFactory::new(DocFactory::new(Arc::clone(&getter)));
        let mut scraper = Scraper {
            factory: Box::new(factory),
            root: None,
            working: Vec::new(),
            error: None,
        };
        match getter.get(url, None) {
            Ok(stream) => match scraper.factory.create(url, stream) {
                Ok(root) => {
                    scraper.root = Some(root);
                    scraper.working.push(NodePath::new());
                }
                Err(err) => scraper.error = Some(err),
            },
            Err(source) => {
                scraper.error = Some(ScrapeError::Fetch {
                    url: url.to_owned(),
                    source,
                })
            }
        }
        scraper
    }
}

impl Scraper {
    /// Start a chain against a URL with the default HTTP getter
    pub fn get(url: &str) -> Self {
        Self::builder().fetch(url)
    }

    pub fn builder() -> ScraperBuilder {
        ScraperBuilder::default()
    }

    /// Replace the working set with every match of `selector` inside the
    /// current working-set nodes
    ///
    /// Matches become child nodes of the node they were found in, so their
    /// records aggregate under it at `done()`. Matching nothing leaves an
    /// empty working set, not an error.
    pub fn filter(mut self, selector: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let compiled = match compile(selector) {
            Ok(compiled) => compiled,
            Err(err) => return self.fail(err),
        };
        let Some(root) = self.root.as_mut() else {
            return self;
        };
        let mut next = Vec::new();
        for path in &self.working {
            let node = root.node_mut(path);
            for index in node.filter(&compiled) {
                let mut child = path.clone();
                child.push(index);
                next.push(child);
            }
        }
        tracing::debug!(selector, from = self.working.len(), to = next.len(), "filtered working set");
        self.working = next;
        self
    }

    /// Extract named values on every working-set node
    ///
    /// Each `(field, selector)` pair is compiled once and applied to every
    /// node; within a node, all matches for a field concatenate in document
    /// order into one string. A node keeps one record across the whole chain:
    /// later select calls merge their fields in, overwriting a repeated field
    /// name. A selector ending in an attribute suffix (`a[href]`) extracts
    /// that attribute and fails the chain when a matched element lacks it.
    pub fn select(mut self, selectors: &[(&str, &str)]) -> Self {
        if self.error.is_some() || selectors.is_empty() {
            return self;
        }
        let mut failure = None;
        'fields: for &(field, selector) in selectors {
            let compiled = match compile(selector) {
                Ok(compiled) => compiled,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            let Some(root) = self.root.as_mut() else {
                break;
            };
            for path in &self.working {
                if let Err(err) = root.node_mut(path).select(field, selector, &compiled) {
                    failure = Some(err);
                    break 'fields;
                }
            }
            tracing::debug!(field, selector, nodes = self.working.len(), "selected field");
        }
        match failure {
            Some(err) => self.fail(err),
            None => self,
        }
    }

    /// Pivot the working set to the documents behind matched links
    ///
    /// The link value is extracted like a select value (attribute suffix
    /// wins over text), resolved against the node's own URL when relative,
    /// then fetched and parsed. Targets that cannot be extracted, fetched or
    /// parsed are skipped; a broken link never aborts the chain.
    pub fn follow(mut self, selector: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let compiled = match compile(selector) {
            Ok(compiled) => compiled,
            Err(err) => return self.fail(err),
        };
        let factory = &*self.factory;
        let Some(root) = self.root.as_mut() else {
            return self;
        };
        let mut next = Vec::new();
        for path in &self.working {
            let node = root.node_mut(path);
            for index in node.follow(selector, &compiled, factory) {
                let mut child = path.clone();
                child.push(index);
                next.push(child);
            }
        }
        tracing::debug!(selector, from = self.working.len(), to = next.len(), "followed links");
        self.working = next;
        self
    }

    /// Finish the chain: the aggregated records, or the first hard failure
    ///
    /// Records flatten depth-first from the root, each node's own record
    /// before its children's, preserving document and follow order.
    pub fn done(self) -> Result<Vec<Record>, ScrapeError> {
        if let Some(err) = self.error {
            tracing::debug!(error = %err, "chain finished with error");
            return Err(err);
        }
        let records = self.root.map(DocNode::into_records).unwrap_or_default();
        tracing::debug!(records = records.len(), "chain finished");
        Ok(records)
    }

    fn fail(mut self, err: ScrapeError) -> Self {
        tracing::warn!(error = %err, "chain failed");
        self.error = Some(err);
        self
    }
}

fn compile(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|err| ScrapeError::InvalidSelector {
        selector: selector.to_owned(),
        message: err.to_string(),
    })
}
