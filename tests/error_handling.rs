use std::io::Read;
use std::sync::{Arc, Mutex};

use websift::{FetchError, Getter, MemoryGetter, ScrapeError, Scraper};

const MAIN_HTML: &str = r#"
    <div class="d">
        <a href="/p1">one</a>
    </div>"#;

/// Memory-backed getter that also records every fetch it serves
#[derive(Clone)]
struct CountingGetter {
    inner: MemoryGetter,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl CountingGetter {
    fn new(inner: MemoryGetter) -> Self {
        Self {
            inner,
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Getter for CountingGetter {
    fn get(&self, url: &str, referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        self.fetches.lock().unwrap().push(url.to_owned());
        self.inner.get(url, referer)
    }
}

#[test]
fn invalid_filter_selector_fails_the_chain() {
    let getter = MemoryGetter::new().page("localhost", MAIN_HTML);
    let err = Scraper::builder()
        .getter(Arc::new(getter))
        .fetch("localhost")
        .filter("div[")
        .done()
        .unwrap_err();

    match err {
        ScrapeError::InvalidSelector { selector, .. } => assert_eq!(selector, "div["),
        other => panic!("expected InvalidSelector, got {other:?}"),
    }
}

#[test]
fn invalid_select_selector_fails_the_chain() {
    let getter = MemoryGetter::new().page("localhost", MAIN_HTML);
    let err = Scraper::builder()
        .getter(Arc::new(getter))
        .fetch("localhost")
        .select(&[("value", ":::")])
        .done()
        .unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidSelector { .. }));
}

#[test]
fn invalid_follow_selector_fails_the_chain() {
    let getter = MemoryGetter::new().page("localhost", MAIN_HTML);
    let err = Scraper::builder()
        .getter(Arc::new(getter))
        .fetch("localhost")
        .follow("a[[")
        .done()
        .unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidSelector { .. }));
}

#[test]
fn first_failure_short_circuits_the_rest_of_the_chain() {
    let getter = CountingGetter::new(
        MemoryGetter::new()
            .page("localhost", MAIN_HTML)
            .page("/p1", "<div class='x'>data</div>"),
    );
    let fetches = Arc::clone(&getter.fetches);

    let err = Scraper::builder()
        .getter(Arc::new(getter))
        .fetch("localhost")
        .filter("div[")
        .follow("a[href]")
        .select(&[("value", "a, b[href]")])
        .done()
        .unwrap_err();

    // The compile error wins; nothing after it runs, so no link was fetched.
    assert!(matches!(err, ScrapeError::InvalidSelector { .. }));
    assert_eq!(*fetches.lock().unwrap(), ["localhost"]);
}

#[test]
fn failed_root_fetch_surfaces_at_done() {
    let err = Scraper::builder()
        .getter(Arc::new(MemoryGetter::new()))
        .fetch("localhost")
        .done()
        .unwrap_err();

    match err {
        ScrapeError::Fetch { url, source } => {
            assert_eq!(url, "localhost");
            assert!(matches!(source, FetchError::NotFound(_)));
        }
        other => panic!("expected Fetch, got {other:?}"),
    }
}

#[test]
fn chain_calls_after_a_failed_init_stay_inert() {
    let err = Scraper::builder()
        .getter(Arc::new(MemoryGetter::new()))
        .fetch("localhost")
        .filter(".d")
        .select(&[("value", ".x")])
        .follow("a[href]")
        .done()
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Fetch { .. }));
}
