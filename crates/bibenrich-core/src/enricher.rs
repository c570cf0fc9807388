//! The enrichment orchestrator.
//!
//! Each paper is driven through a small state machine:
//!
//! ```text
//! Start ──(title)──> TryAuthoritative ──(data)──> Done
//!   │                       │
//!   └──(no title)──> Done   └──(no data)──> TryFallbackSearch ──> Done
//! ```
//!
//! Papers are processed strictly one after another with a fixed pause in
//! between, and every failure inside a paper's pipeline is recorded on its
//! [`EnrichmentResult`] instead of being propagated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzer::analyze_file;
use crate::extract::{HtmlExtractor, PageExtractor, PageMetadata};
use crate::record::{PaperRecord, join_blocks, render_enriched, split_blocks};
use crate::resolver::{DoiResolver, Resolver, is_resolvable};
use crate::runlog::{RunLog, markers};
use crate::search::{GoogleSearch, SearchClient};
use crate::validate::validate;
use crate::{
    AcquisitionMethod, Config, DataKind, EnrichError, EnrichReport, EnrichmentResult, ScoredField,
    SourceMethod,
};

const DOI_PAGE_EMPTY: &str = "DOI page metadata extraction failed";

/// Pipeline stage of a single paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    TryAuthoritative,
    TryFallbackSearch,
    Done,
}

impl Stage {
    /// The stage that follows `self`.
    ///
    /// `has_title` decides whether the paper is enrichable at all, `has_data`
    /// whether authors or an abstract have been found so far. Every path ends
    /// in [`Stage::Done`].
    pub fn next(self, has_title: bool, has_data: bool) -> Stage {
        match self {
            Stage::Start if has_title => Stage::TryAuthoritative,
            Stage::Start => Stage::Done,
            Stage::TryAuthoritative if has_data => Stage::Done,
            Stage::TryAuthoritative => Stage::TryFallbackSearch,
            Stage::TryFallbackSearch | Stage::Done => Stage::Done,
        }
    }
}

/// Result of enriching a whole document in memory.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    /// The enriched document text.
    pub text: String,
    pub papers: usize,
    pub enriched: usize,
    pub skipped: usize,
}

/// `<dir>/<output-stem>_results.txt` for an output file path.
pub fn results_log_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_results.txt", stem))
}

/// First `max` characters of `s`.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn format_confidence(field: &Option<ScoredField>) -> String {
    field
        .as_ref()
        .map(|f| format!("{}%", f.confidence))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Drives paper records through DOI resolution and web search fallback.
pub struct Enricher {
    resolver: Arc<dyn Resolver>,
    search: Arc<dyn SearchClient>,
    extractor: Arc<dyn PageExtractor>,
    config: Config,
}

impl Enricher {
    pub fn new(
        resolver: Arc<dyn Resolver>,
        search: Arc<dyn SearchClient>,
        extractor: Arc<dyn PageExtractor>,
        config: Config,
    ) -> Self {
        Self {
            resolver,
            search,
            extractor,
            config,
        }
    }

    /// Build an enricher backed by doi.org, Google Custom Search and HTTP scraping.
    pub fn from_config(config: Config) -> Result<Self, EnrichError> {
        let client = config.http_client()?;

        let resolver = DoiResolver::new(
            client.clone(),
            config.resolver_url.clone(),
            config.resolve_timeout(),
        );
        let search = GoogleSearch::new(
            client.clone(),
            config.search_url.clone(),
            config.google_api_key.clone(),
            config.google_cse_id.clone(),
            config.search_timeout(),
        );
        if !search.has_credentials() {
            tracing::warn!("search API key or engine id missing, web search fallback will find nothing");
        }
        let extractor = HtmlExtractor::new(client, config.fetch_timeout());

        Ok(Self::new(
            Arc::new(resolver),
            Arc::new(search),
            Arc::new(extractor),
            config,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enrich the references in `input`, writing the enriched document to
    /// `output` and the run log next to it.
    pub async fn enrich(&self, input: &Path, output: &Path) -> Result<EnrichReport, EnrichError> {
        let content =
            std::fs::read_to_string(input).map_err(|source| EnrichError::ReadInput {
                path: input.to_path_buf(),
                source,
            })?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EnrichError::CreateOutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut log = RunLog::start();
        log.info("Starting to enrich references with DOI-first approach...");

        let outcome = self.enrich_document(&content, &mut log).await;

        std::fs::write(output, &outcome.text).map_err(|source| EnrichError::WriteOutput {
            path: output.to_path_buf(),
            source,
        })?;

        let log_path = results_log_path(output);
        log.write_to(&log_path)
            .map_err(|source| EnrichError::WriteLog {
                path: log_path.clone(),
                source,
            })?;

        tracing::info!(
            papers = outcome.papers,
            enriched = outcome.enriched,
            skipped = outcome.skipped,
            output = %output.display(),
            log = %log_path.display(),
            "enrichment complete"
        );

        let stats = analyze_file(&log_path);

        Ok(EnrichReport {
            papers: outcome.papers,
            enriched: outcome.enriched,
            skipped: outcome.skipped,
            output_path: output.to_path_buf(),
            log_path,
            stats,
        })
    }

    /// Enrich every block of `content`, pausing `config.delay()` after each.
    pub async fn enrich_document(&self, content: &str, log: &mut RunLog) -> DocumentOutcome {
        let blocks = split_blocks(content);
        let total = blocks.len();
        log.info(format!("Found {} papers to process", total));

        let mut out = Vec::with_capacity(total);
        let mut enriched = 0;
        let mut skipped = 0;

        for (i, block) in blocks.iter().enumerate() {
            log.info(format!("[{}/{}] {}", i + 1, total, "=".repeat(50)));

            let record = PaperRecord::parse(block);
            match self.process_record(&record, log).await {
                Some(result) => {
                    enriched += 1;
                    out.push(render_enriched(block, &result));
                }
                None => {
                    skipped += 1;
                    out.push(block.to_string());
                }
            }

            // Rate limit for doi.org and the search API, applied after every paper
            tokio::time::sleep(self.config.delay()).await;
        }

        DocumentOutcome {
            text: join_blocks(&out),
            papers: total,
            enriched,
            skipped,
        }
    }

    /// Enrich a single block; blocks without a title come back unchanged.
    pub async fn process_block(&self, block: &str, log: &mut RunLog) -> String {
        let record = PaperRecord::parse(block);
        match self.process_record(&record, log).await {
            Some(result) => render_enriched(block, &result),
            None => block.to_string(),
        }
    }

    /// Run one record through the stage machine.
    ///
    /// Returns `None` when the record has no title and was skipped.
    pub async fn process_record(
        &self,
        record: &PaperRecord,
        log: &mut RunLog,
    ) -> Option<EnrichmentResult> {
        let has_title = record.is_enrichable();
        let title = record.title.as_deref().unwrap_or_default();
        let mut result = EnrichmentResult::default();
        let mut stage = Stage::Start;

        loop {
            let next = match stage {
                Stage::Start => {
                    if !has_title {
                        log.warn(format!("{}, skipping paper", markers::NO_TITLE));
                        return None;
                    }
                    log.info(format!("Processing: {}...", truncate_chars(title, 60)));
                    log.info(format!(
                        "DOI: {}",
                        record.doi.as_deref().unwrap_or("not available")
                    ));
                    stage.next(has_title, false)
                }
                Stage::TryAuthoritative => {
                    self.try_authoritative(record, title, &mut result, log)
                        .await;
                    stage.next(has_title, result.has_data())
                }
                Stage::TryFallbackSearch => {
                    self.try_fallback_search(title, &mut result, log).await;
                    stage.next(has_title, result.has_data())
                }
                Stage::Done => break,
            };
            tracing::trace!(from = ?stage, to = ?next, "stage transition");
            stage = next;
        }

        self.finish(&mut result, log);
        Some(result)
    }

    async fn try_authoritative(
        &self,
        record: &PaperRecord,
        title: &str,
        result: &mut EnrichmentResult,
        log: &mut RunLog,
    ) {
        let Some(doi) = record.doi.as_deref().filter(|d| is_resolvable(Some(*d))) else {
            tracing::debug!(doi = ?record.doi, "no resolvable DOI, skipping authoritative stage");
            return;
        };

        log.info(format!("{} for DOI {}", markers::RESOLUTION_ATTEMPT, doi));
        match self.resolver.resolve(doi).await {
            Ok(url) => {
                log.info(format!("{} {}", markers::RESOLVED, url));
                let page = self.fetch_page(&url).await;
                if page.is_empty() {
                    log.info(DOI_PAGE_EMPTY);
                    result.errors.push(DOI_PAGE_EMPTY.to_string());
                } else {
                    self.apply_page(
                        result,
                        page,
                        title,
                        &url,
                        AcquisitionMethod::AuthoritativeDirect,
                        log,
                    );
                }
            }
            Err(e) => {
                let message = format!("{} {}", markers::RESOLUTION_FAILED, e);
                log.warn(message.clone());
                result.errors.push(message);
            }
        }
    }

    async fn try_fallback_search(
        &self,
        title: &str,
        result: &mut EnrichmentResult,
        log: &mut RunLog,
    ) {
        log.info(format!("{}...", markers::FALLBACK));

        let query = format!("\"{}\"", title);
        let hits = match self.search.search(&query, self.config.search_results).await {
            Ok(hits) => hits,
            Err(e) => {
                log.warn(format!("Search error: {}", e));
                Vec::new()
            }
        };

        for (i, hit) in hits.iter().take(self.config.max_candidates).enumerate() {
            log.info(format!(
                "Trying search result {}: {}...",
                i + 1,
                truncate_chars(&hit.title, 50)
            ));
            let page = self.fetch_page(&hit.link).await;
            if !page.is_empty() {
                self.apply_page(
                    result,
                    page,
                    title,
                    &hit.link,
                    AcquisitionMethod::SearchFallback,
                    log,
                );
                log.info(markers::FALLBACK_SUCCESS);
                return;
            }
        }

        log.warn(markers::NO_RESULTS);
        result.errors.push(markers::NO_RESULTS.to_string());
    }

    /// Fetch and parse a page; failures count as an empty page.
    async fn fetch_page(&self, url: &str) -> PageMetadata {
        match self.extractor.extract(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(url, error = %e, "metadata extraction failed");
                PageMetadata::default()
            }
        }
    }

    /// Score the page's fields and store them, with `url` as the webpage.
    fn apply_page(
        &self,
        result: &mut EnrichmentResult,
        page: PageMetadata,
        title: &str,
        url: &str,
        method: AcquisitionMethod,
        log: &mut RunLog,
    ) {
        let table = &self.config.confidence;

        if !page.authors.is_empty() {
            let flags = validate(&page.authors, title, DataKind::Authors);
            let confidence = table.calculate(DataKind::Authors, method, flags);
            log.info(format!("Authors confidence: {}%", confidence));
            result.authors = Some(ScoredField::new(page.authors, confidence));
        }
        if !page.abstract_text.is_empty() {
            let flags = validate(&page.abstract_text, title, DataKind::Abstract);
            let confidence = table.calculate(DataKind::Abstract, method, flags);
            log.info(format!("Abstract confidence: {}%", confidence));
            result.abstract_text = Some(ScoredField::new(page.abstract_text, confidence));
        }

        result.webpage = Some(ScoredField::new(url, table.webpage(method)));
        result.source_method = match method {
            AcquisitionMethod::AuthoritativeDirect => SourceMethod::DoiDirect,
            AcquisitionMethod::SearchFallback => SourceMethod::GoogleFallback,
            AcquisitionMethod::Unclassified => SourceMethod::Unresolved,
        };
    }

    fn finish(&self, result: &mut EnrichmentResult, log: &mut RunLog) {
        result.finalize(self.config.confidence.review_threshold);
        if result.needs_review {
            log.warn(format!(
                "{} Low confidence or errors detected",
                markers::REVIEW_NEEDED
            ));
        }
        log.info(format!(
            "Final confidence scores - Authors: {}, Abstract: {}, Webpage: {}",
            format_confidence(&result.authors),
            format_confidence(&result.abstract_text),
            format_confidence(&result.webpage),
        ));
        if !result.errors.is_empty() {
            log.info(format!("Errors: {}", result.errors.join("; ")));
        }
    }
}
