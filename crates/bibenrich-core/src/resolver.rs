//! DOI resolution: follow doi.org redirects to the publisher landing page.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub const DEFAULT_RESOLVER_URL: &str = "https://doi.org";

/// Why a DOI could not be resolved to a landing page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Identifier absent, marked "not available" or an ISBN. No request is made.
    #[error("No valid DOI")]
    NoIdentifier,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ResolveError::Timeout
        } else {
            ResolveError::Transport(e.to_string())
        }
    }
}

pub type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ResolveError>> + Send + 'a>>;

/// Turns an authoritative identifier into the URL of its landing page.
pub trait Resolver: Send + Sync {
    /// Resolve `identifier`, returning the final URL after redirects.
    fn resolve<'a>(&'a self, identifier: &'a str) -> ResolveFuture<'a>;
}

/// Whether `identifier` is worth sending to the resolver at all.
pub fn is_resolvable(identifier: Option<&str>) -> bool {
    match identifier.map(str::trim) {
        None | Some("") => false,
        Some(id) => !id.eq_ignore_ascii_case("not available") && !id.contains("ISBN"),
    }
}

/// Resolves DOIs through a doi.org-style HTTP resolver.
pub struct DoiResolver {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DoiResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn url_for(&self, doi: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), doi.trim())
    }
}

impl Resolver for DoiResolver {
    fn resolve<'a>(&'a self, identifier: &'a str) -> ResolveFuture<'a> {
        Box::pin(async move {
            if !is_resolvable(Some(identifier)) {
                return Err(ResolveError::NoIdentifier);
            }

            let url = self.url_for(identifier);
            tracing::debug!(doi = identifier, url = %url, "resolving DOI");

            // reqwest follows redirects by default; the response URL is the landing page
            let resp = self
                .client
                .get(&url)
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .timeout(self.timeout)
                .send()
                .await?;

            if resp.status() == StatusCode::OK {
                Ok(resp.url().to_string())
            } else {
                Err(ResolveError::Status(resp.status().as_u16()))
            }
        })
    }
}
