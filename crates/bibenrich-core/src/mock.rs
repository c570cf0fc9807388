//! Hand-rolled mock collaborators for orchestrator tests.
//!
//! Each mock counts its calls and records the arguments so tests can assert
//! which stages ran, in which order, without any network access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::extract::{ExtractError, ExtractFuture, PageExtractor, PageMetadata};
use crate::resolver::{ResolveError, ResolveFuture, Resolver};
use crate::search::{SearchClient, SearchError, SearchFuture, SearchHit};

/// Shared call journal, so tests can check ordering across mocks.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Resolver returning a fixed response for every identifier.
pub struct MockResolver {
    response: Result<String, ResolveError>,
    call_count: AtomicUsize,
    journal: Option<std::sync::Arc<CallLog>>,
}

impl MockResolver {
    pub fn resolving_to(url: &str) -> Self {
        Self::new(Ok(url.to_string()))
    }

    pub fn failing(error: ResolveError) -> Self {
        Self::new(Err(error))
    }

    fn new(response: Result<String, ResolveError>) -> Self {
        Self {
            response,
            call_count: AtomicUsize::new(0),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: std::sync::Arc<CallLog>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Resolver for MockResolver {
    fn resolve<'a>(&'a self, identifier: &'a str) -> ResolveFuture<'a> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(ref j) = self.journal {
            j.record(format!("resolve {identifier}"));
        }
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

/// Search client returning a fixed hit list (or error).
pub struct MockSearch {
    response: Result<Vec<SearchHit>, SearchError>,
    call_count: AtomicUsize,
    queries: Mutex<Vec<(String, usize)>>,
    journal: Option<std::sync::Arc<CallLog>>,
}

impl MockSearch {
    pub fn with_links(links: &[&str]) -> Self {
        let hits = links
            .iter()
            .enumerate()
            .map(|(i, link)| SearchHit {
                title: format!("Result {}", i + 1),
                link: link.to_string(),
                snippet: String::new(),
            })
            .collect();
        Self::new(Ok(hits))
    }

    pub fn empty() -> Self {
        Self::new(Ok(vec![]))
    }

    pub fn failing(error: SearchError) -> Self {
        Self::new(Err(error))
    }

    fn new(response: Result<Vec<SearchHit>, SearchError>) -> Self {
        Self {
            response,
            call_count: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: std::sync::Arc<CallLog>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// `(query, num_results)` for every call.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

impl SearchClient for MockSearch {
    fn search<'a>(&'a self, query: &'a str, num_results: usize) -> SearchFuture<'a> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), num_results));
        if let Some(ref j) = self.journal {
            j.record(format!("search {query}"));
        }
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

/// Extractor with per-URL canned pages. Unknown URLs yield an empty page.
#[derive(Default)]
pub struct MockExtractor {
    pages: HashMap<String, Result<PageMetadata, ExtractError>>,
    visited: Mutex<Vec<String>>,
    journal: Option<std::sync::Arc<CallLog>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, authors: &str, abstract_text: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            Ok(PageMetadata {
                abstract_text: abstract_text.to_string(),
                authors: authors.to_string(),
            }),
        );
        self
    }

    pub fn failing_page(mut self, url: &str, error: ExtractError) -> Self {
        self.pages.insert(url.to_string(), Err(error));
        self
    }

    pub fn with_journal(mut self, journal: std::sync::Arc<CallLog>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// URLs passed to `extract`, in call order.
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl PageExtractor for MockExtractor {
    fn extract<'a>(&'a self, url: &'a str) -> ExtractFuture<'a> {
        self.visited.lock().unwrap().push(url.to_string());
        if let Some(ref j) = self.journal {
            j.record(format!("extract {url}"));
        }
        let response = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(PageMetadata::default()));
        Box::pin(async move { response })
    }
}
