use std::io::Read;
use std::sync::{Arc, Mutex};

use websift::{resolve_url, FetchError, FileGetter, Getter, MemoryGetter, Scraper, UrlResolver, UserAgentPool};

fn read_all(getter: &dyn Getter, url: &str) -> String {
    let mut stream = getter.get(url, None).unwrap();
    let mut content = String::new();
    stream.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn memory_getter_serves_registered_pages() {
    let getter = MemoryGetter::new().page("localhost", "test data");
    assert_eq!(read_all(&getter, "localhost"), "test data");
}

#[test]
fn memory_getter_reports_unknown_urls() {
    let getter = MemoryGetter::new();
    match getter.get("localhost", None) {
        Err(FetchError::NotFound(url)) => assert_eq!(url, "localhost"),
        Err(other) => panic!("expected NotFound, got {other:?}"),
        Ok(_) => panic!("expected NotFound, got Ok(stream)"),
    }
}

#[test]
fn file_getter_serves_mapped_files() {
    let getter = FileGetter::new().file("localhost", "tests/fixtures/page.html");
    let expected = std::fs::read_to_string("tests/fixtures/page.html").unwrap();
    assert_eq!(read_all(&getter, "localhost"), expected);
}

#[test]
fn file_getter_feeds_a_full_chain() {
    let getter = FileGetter::new().file("localhost", "tests/fixtures/page.html");
    let records = Scraper::builder()
        .getter(Arc::new(getter))
        .fetch("localhost")
        .filter(".listing")
        .select(&[("items", ".item")])
        .done()
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["items"], "alphabeta");
}

#[test]
fn file_getter_reports_unknown_urls_and_missing_files() {
    let getter = FileGetter::new().file("localhost", "tests/fixtures/absent.html");
    assert!(matches!(
        getter.get("elsewhere", None),
        Err(FetchError::NotFound(_))
    ));
    assert!(matches!(getter.get("localhost", None), Err(FetchError::Io(_))));
}

#[test]
fn user_agents_rotate_round_robin() {
    let agents = ["userAgent1", "userAgent2", "userAgent3"];
    let pool = UserAgentPool::new(agents);

    for round in 0..agents.len() * 2 {
        assert_eq!(pool.next_agent(), agents[round % agents.len()]);
    }
}

#[test]
fn empty_user_agent_pool_yields_the_empty_string() {
    let pool = UserAgentPool::new(Vec::<String>::new());
    assert_eq!(pool.next_agent(), "");
}

#[test]
fn url_resolution_table() {
    assert_eq!(resolve_url("http://test", ""), "http://test");
    assert_eq!(resolve_url("/p1", ""), "/p1");
    assert_eq!(resolve_url("/p1", "http://test"), "http://test/p1");
    assert_eq!(resolve_url("/p1", "localhost"), "/p1");
    assert_eq!(resolve_url("http://other/x", "http://test"), "http://other/x");
}

/// Getter that records every URL it is asked for
#[derive(Default, Clone)]
struct RecordingGetter {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Getter for RecordingGetter {
    fn get(&self, url: &str, _referer: Option<&str>) -> Result<Box<dyn Read + Send>, FetchError> {
        self.seen.lock().unwrap().push(url.to_owned());
        Err(FetchError::NotFound(url.to_owned()))
    }
}

#[test]
fn resolver_hands_absolute_urls_to_the_inner_getter() {
    let recorder = RecordingGetter::default();
    let resolver = UrlResolver::new(recorder.clone());

    let _ = resolver.get("http://test", None);
    let _ = resolver.get("/p1", None);
    let _ = resolver.get("/p1", Some("http://test"));

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(*seen, ["http://test", "/p1", "http://test/p1"]);
}
