use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub mod analyzer;
pub mod confidence;
pub mod config_file;
pub mod enricher;
pub mod extract;
pub mod record;
pub mod resolver;
pub mod runlog;
pub mod search;
pub mod validate;

#[cfg(test)]
mod mock;

// Re-export for convenience
pub use analyzer::{ConfidenceBuckets, RunStats, analyze_file, analyze_log};
pub use confidence::ConfidenceTable;
pub use enricher::{Enricher, Stage, results_log_path};
pub use extract::{HtmlExtractor, PageExtractor, PageMetadata};
pub use record::PaperRecord;
pub use resolver::{DoiResolver, ResolveError, Resolver};
pub use runlog::{LogEntry, RunLog};
pub use search::{GoogleSearch, SearchClient, SearchError, SearchHit};
pub use validate::validate;

/// Browser-like user agent; several publisher sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Kind of metadata being validated or scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Authors,
    Abstract,
}

/// How a piece of metadata was obtained. Drives the base confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMethod {
    /// Landing page reached by resolving the paper's DOI.
    AuthoritativeDirect,
    /// Landing page found through the web search fallback.
    SearchFallback,
    Unclassified,
}

/// Structural and relevance checks for one extracted value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationFlags {
    pub format_valid: bool,
    pub content_relevant: bool,
    /// Never set by [`validate`]; kept so the scoring table has a slot for it.
    pub source_reliable: bool,
}

impl ValidationFlags {
    /// Number of flags that are set.
    pub fn count(&self) -> u32 {
        [self.format_valid, self.content_relevant, self.source_reliable]
            .into_iter()
            .filter(|&f| f)
            .count() as u32
    }
}

/// Where the enrichment data for a paper came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceMethod {
    DoiDirect,
    GoogleFallback,
    /// Neither stage produced any data.
    #[default]
    Unresolved,
}

impl SourceMethod {
    /// Label written to the `Source_Method` output line.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMethod::DoiDirect => "DOI_DIRECT",
            SourceMethod::GoogleFallback => "GOOGLE_FALLBACK",
            SourceMethod::Unresolved => "NONE",
        }
    }
}

impl std::fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extracted value together with its confidence score (0-100).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredField {
    pub value: String,
    pub confidence: u8,
}

impl ScoredField {
    pub fn new(value: impl Into<String>, confidence: u8) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// The enrichment outcome for a single paper.
///
/// A field is `None` when it was not populated; its confidence only counts
/// towards the review decision when the field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub authors: Option<ScoredField>,
    pub abstract_text: Option<ScoredField>,
    pub webpage: Option<ScoredField>,
    pub source_method: SourceMethod,
    pub needs_review: bool,
    pub errors: Vec<String>,
}

impl EnrichmentResult {
    /// True once either authors or an abstract has been found.
    pub fn has_data(&self) -> bool {
        self.authors.is_some() || self.abstract_text.is_some()
    }

    /// Confidences of the populated fields, in output order.
    pub fn confidences(&self) -> impl Iterator<Item = u8> + '_ {
        [&self.authors, &self.abstract_text, &self.webpage]
            .into_iter()
            .flatten()
            .map(|f| f.confidence)
    }

    /// Whether this result has to be checked by a human.
    pub fn requires_review(&self, threshold: u8) -> bool {
        !self.errors.is_empty() || self.confidences().any(|c| c < threshold)
    }

    /// Set `needs_review` from the current fields and errors.
    pub fn finalize(&mut self, threshold: u8) {
        self.needs_review = self.requires_review(threshold);
    }
}

/// Errors that abort a whole enrichment run.
///
/// Failures inside a single paper's pipeline never surface here; they end up
/// in [`EnrichmentResult::errors`] instead.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to read input file {}: {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write output file {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write results log {}: {source}", path.display())]
    WriteLog {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summary of a completed `enrich` run.
#[derive(Debug, Clone)]
pub struct EnrichReport {
    /// Number of input blocks processed (enriched + skipped).
    pub papers: usize,
    pub enriched: usize,
    /// Blocks passed through because they had no title.
    pub skipped: usize,
    pub output_path: PathBuf,
    pub log_path: PathBuf,
    /// `None` if the results log could not be read back.
    pub stats: Option<RunStats>,
}

/// Configuration for the enrichment pipeline.
#[derive(Clone)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    /// Pause after every paper, successful or not.
    pub delay_secs: f64,
    pub resolve_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub search_timeout_secs: u64,
    /// Number of results requested from the search API.
    pub search_results: usize,
    /// How many of those results are fetched before giving up.
    pub max_candidates: usize,
    /// Base URL the DOI is appended to (e.g., "https://doi.org").
    pub resolver_url: String,
    pub search_url: String,
    pub user_agent: String,
    pub confidence: ConfidenceTable,
}

impl Config {
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Build the shared HTTP client used by every network collaborator.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .build()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "***"),
            )
            .field("google_cse_id", &self.google_cse_id.as_ref().map(|_| "***"))
            .field("delay_secs", &self.delay_secs)
            .field("resolve_timeout_secs", &self.resolve_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field("search_results", &self.search_results)
            .field("max_candidates", &self.max_candidates)
            .field("resolver_url", &self.resolver_url)
            .field("search_url", &self.search_url)
            .field("user_agent", &self.user_agent)
            .field("confidence", &self.confidence)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cse_id: None,
            delay_secs: 1.0,
            resolve_timeout_secs: 15,
            fetch_timeout_secs: 10,
            search_timeout_secs: 15,
            search_results: 3,
            max_candidates: 2,
            resolver_url: resolver::DEFAULT_RESOLVER_URL.to_string(),
            search_url: search::DEFAULT_SEARCH_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            confidence: ConfidenceTable::default(),
        }
    }
}

/// Enrich every reference in `input` and write the result to `output`.
///
/// Records are processed one at a time with `config.delay_secs` between them.
/// A `<output-stem>_results.txt` log is written next to `output` and analyzed
/// once the run completes.
pub async fn enrich(
    input: &Path,
    output: &Path,
    config: Config,
) -> Result<EnrichReport, EnrichError> {
    let enricher = Enricher::from_config(config)?;
    enricher.enrich(input, output).await
}
