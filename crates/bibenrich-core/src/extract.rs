//! Author and abstract scraping from paper landing pages.
//!
//! Extraction is heuristic: a fixed, prioritized list of CSS selectors is
//! tried against the page and the first plausible match wins.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Author containers, most specific first.
pub const AUTHOR_SELECTORS: [&str; 5] = [
    ".authors",
    ".author-list",
    "[class*=\"author\"]",
    ".citation-authors",
    ".contributors",
];

/// Abstract containers, most specific first.
pub const ABSTRACT_SELECTORS: [&str; 6] = [
    ".abstract",
    ".article-abstract",
    "[id*=\"abstract\"]",
    "[class*=\"abstract\"]",
    ".article-text",
    ".content",
];

/// An author candidate must mention one of these (lower-cased).
const AUTHOR_KEYWORDS: [&str; 3] = ["author", "by ", "et al"];

/// Abstract candidates must be longer than this many characters.
const MIN_ABSTRACT_CHARS: usize = 100;
/// Longer abstracts are cut to this many characters plus "...".
const MAX_ABSTRACT_CHARS: usize = 500;

/// Metadata scraped from one page. Empty strings mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub abstract_text: String,
    pub authors: String,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.abstract_text.is_empty() && self.authors.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
}

pub type ExtractFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PageMetadata, ExtractError>> + Send + 'a>>;

/// Fetches a page and pulls authors and abstract out of it.
pub trait PageExtractor: Send + Sync {
    fn extract<'a>(&'a self, url: &'a str) -> ExtractFuture<'a>;
}

/// [`PageExtractor`] that downloads HTML over HTTP and parses it with `scraper`.
pub struct HtmlExtractor {
    client: reqwest::Client,
    timeout: Duration,
}

impl HtmlExtractor {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl PageExtractor for HtmlExtractor {
    fn extract<'a>(&'a self, url: &'a str) -> ExtractFuture<'a> {
        Box::pin(async move {
            let resp = self
                .client
                .get(url)
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| ExtractError::Transport(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(ExtractError::Status(resp.status().as_u16()));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| ExtractError::Transport(e.to_string()))?;

            Ok(parse_page(&body))
        })
    }
}

/// Extract authors and abstract from an HTML document.
pub fn parse_page(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    PageMetadata {
        abstract_text: extract_abstract(&document),
        authors: extract_authors(&document),
    }
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// Whitespace-normalized text content of an element.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_authors(document: &Html) -> String {
    for selector in AUTHOR_SELECTORS {
        if let Some(element) = first_match(document, selector) {
            let text = element_text(element);
            let lower = text.to_lowercase();
            if AUTHOR_KEYWORDS.iter().any(|k| lower.contains(k)) {
                return text;
            }
        }
    }
    String::new()
}

fn extract_abstract(document: &Html) -> String {
    for selector in ABSTRACT_SELECTORS {
        if let Some(element) = first_match(document, selector) {
            let text = element_text(element);
            if text.chars().count() > MIN_ABSTRACT_CHARS {
                return truncate_abstract(&text);
            }
        }
    }
    String::new()
}

fn truncate_abstract(text: &str) -> String {
    if text.chars().count() > MAX_ABSTRACT_CHARS {
        let cut: String = text.chars().take(MAX_ABSTRACT_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
