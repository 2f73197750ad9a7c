//! Document nodes and the node factory
//!
//! A [`DocNode`] wraps one subtree of a parsed document together with the
//! children spawned from it by filter and follow steps. The node tree is
//! owned strictly by containment: every node holds its children, aggregation
//! is a top-down traversal, and the engine addresses nodes by child-index
//! paths. Element handles of the `scraper` backend borrow their owning
//! document, so the parsed DOM of one fetched page is shared read-only via
//! `Rc` among that page's filter-descendants.

use std::collections::HashMap;
use std::io::Read;
use std::rc::Rc;
use std::sync::Arc;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;
use crate::getter::{resolve_url, Getter};

/// One extracted result: field name to string value
pub type Record = HashMap<String, String>;

/// Builds a root [`DocNode`] from a fetched byte stream
pub(crate) trait NodeFactory {
    fn create(&self, url: &str, stream: Box<dyn Read + Send>) -> Result<DocNode, ScrapeError>;
}

/// Default factory: read the stream, let the HTML parser recover whatever it
/// can, wrap the result
pub(crate) struct DocFactory {
    getter: Arc<dyn Getter>,
}

impl DocFactory {
    pub(crate) fn new(getter: Arc<dyn Getter>) -> Self {
        Self { getter }
    }
}

impl NodeFactory for DocFactory {
    fn create(&self, url: &str, mut stream: Box<dyn Read + Send>) -> Result<DocNode, ScrapeError> {
        let mut content = String::new();
        stream
            .read_to_string(&mut content)
            .map_err(|source| ScrapeError::Parse {
                url: url.to_owned(),
                source,
            })?;
        let doc = Html::parse_document(&content);
        Ok(DocNode::document(Arc::clone(&self.getter), url, doc))
    }
}

pub(crate) struct DocNode {
    getter: Arc<dyn Getter>,
    url: String,
    doc: Rc<Html>,
    subtree: NodeId,
    data: Option<Record>,
    children: Vec<DocNode>,
}

impl DocNode {
    /// Root node for a freshly parsed document
    fn document(getter: Arc<dyn Getter>, url: &str, doc: Html) -> Self {
        let doc = Rc::new(doc);
        let subtree = doc.tree.root().id();
        Self {
            getter,
            url: url.to_owned(),
            doc,
            subtree,
            data: None,
            children: Vec::new(),
        }
    }

    /// Walk a child-index path down from this node
    ///
    /// Paths are produced by the engine from filter/follow results and stay
    /// valid because child lists only grow.
    pub(crate) fn node_mut(&mut self, path: &[usize]) -> &mut DocNode {
        let mut current = self;
        for &index in path {
            current = &mut current.children[index];
        }
        current
    }

    /// Elements matching `compiled` within this node's subtree, in document
    /// order
    fn matches(&self, compiled: &Selector) -> Vec<ElementRef<'_>> {
        match self.doc.tree.get(self.subtree).and_then(ElementRef::wrap) {
            Some(element) => element.select(compiled).collect(),
            None => self.doc.select(compiled).collect(),
        }
    }

    /// Wrap every match as a new child node and report the appended range
    pub(crate) fn filter(&mut self, compiled: &Selector) -> std::ops::Range<usize> {
        let start = self.children.len();
        let matched: Vec<NodeId> = self.matches(compiled).iter().map(|el| el.id()).collect();
        for id in matched {
            self.children.push(DocNode {
                getter: Arc::clone(&self.getter),
                url: self.url.clone(),
                doc: Rc::clone(&self.doc),
                subtree: id,
                data: None,
                children: Vec::new(),
            });
        }
        start..self.children.len()
    }

    /// Extract `field` from every match and store it on this node's record
    ///
    /// Match values concatenate in document order into one string; fields
    /// from earlier select calls are kept, a repeated field name is
    /// overwritten.
    pub(crate) fn select(
        &mut self,
        field: &str,
        selector: &str,
        compiled: &Selector,
    ) -> Result<(), ScrapeError> {
        let mut value = String::new();
        for element in self.matches(compiled) {
            value.push_str(&text_or_attr(selector, &element)?);
        }
        self.data
            .get_or_insert_with(Record::new)
            .insert(field.to_owned(), value);
        Ok(())
    }

    /// Fetch and parse every link target matched by `compiled`, appending the
    /// resulting documents as children
    ///
    /// A target whose value cannot be extracted, fetched or parsed is skipped
    /// and contributes no child.
    pub(crate) fn follow(
        &mut self,
        selector: &str,
        compiled: &Selector,
        factory: &dyn NodeFactory,
    ) -> std::ops::Range<usize> {
        let start = self.children.len();
        let targets: Vec<String> = self
            .matches(compiled)
            .iter()
            .filter_map(|element| text_or_attr(selector, element).ok())
            .collect();
        for target in targets {
            let resolved = resolve_url(&target, &self.url);
            let stream = match self.getter.get(&target, Some(&self.url)) {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!(url = %resolved, error = %err, "skipping unreachable follow target");
                    continue;
                }
            };
            match factory.create(&resolved, stream) {
                Ok(child) => self.children.push(child),
                Err(err) => {
                    tracing::debug!(url = %resolved, error = %err, "skipping unreadable follow target");
                }
            }
        }
        start..self.children.len()
    }

    /// This node's record followed by each child's records, depth-first in
    /// child order
    pub(crate) fn into_records(self) -> Vec<Record> {
        let mut records = Vec::new();
        self.collect_into(&mut records);
        records
    }

    fn collect_into(self, records: &mut Vec<Record>) {
        if let Some(record) = self.data {
            records.push(record);
        }
        for child in self.children {
            child.collect_into(records);
        }
    }
}

/// Attribute value when the selector carries an attribute suffix, normalized
/// text otherwise
fn text_or_attr(selector: &str, element: &ElementRef) -> Result<String, ScrapeError> {
    match attr_suffix(selector) {
        Some(attr) => attr_value(element, attr).map(str::to_owned).ok_or_else(|| {
            ScrapeError::MissingAttribute {
                selector: selector.to_owned(),
                attr: attr.to_owned(),
            }
        }),
        None => Ok(normalized_text(element)),
    }
}

/// Attribute name referenced by a trailing `[name]` or `[name=value]` suffix
///
/// The suffix counts only when the closing bracket is the very last character
/// of the selector; anything before the first `=` names the attribute and an
/// empty name means no suffix. The suffix is valid CSS, so the selector is
/// compiled whole and the suffix additionally constrains matching.
fn attr_suffix(selector: &str) -> Option<&str> {
    if !selector.ends_with(']') {
        return None;
    }
    let open = selector.rfind('[')?;
    let inner = &selector[open + 1..selector.len() - 1];
    let name = match inner.find('=') {
        Some(eq) => &inner[..eq],
        None => inner,
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Attribute lookup, case-insensitive in the name
fn attr_value<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attrs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Text of the matched subtree with whitespace runs collapsed to single
/// spaces and the ends trimmed
fn normalized_text(element: &ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_suffix_parsing() {
        let cases = [
            ("", None),
            ("a", None),
            ("a[", None),
            ("a]", None),
            ("a[]", None),
            ("a[href]", Some("href")),
            ("a[href] span", None),
            (r#"a[href="/url"]"#, Some("href")),
            ("div[myAttr]", Some("myAttr")),
            (r#"div[myAttr="value"]"#, Some("myAttr")),
            (r#"div[myAttr="value"] p"#, None),
        ];
        for (selector, expected) in cases {
            assert_eq!(attr_suffix(selector), expected, "selector {selector:?}");
        }
    }

    #[test]
    fn text_is_normalized() {
        let html = Html::parse_document("<div>  a \n\t b <span>c</span>\n</div>");
        let compiled = Selector::parse("div").unwrap();
        let element = html.select(&compiled).next().unwrap();
        assert_eq!(normalized_text(&element), "a b c");
    }

    #[test]
    fn attr_lookup_is_case_insensitive() {
        let html = Html::parse_document(r#"<div data-kind="x">t</div>"#);
        let compiled = Selector::parse("div").unwrap();
        let element = html.select(&compiled).next().unwrap();
        assert_eq!(attr_value(&element, "DATA-KIND"), Some("x"));
        assert_eq!(attr_value(&element, "missing"), None);
    }
}
