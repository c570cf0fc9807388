//! Post-hoc statistics over a results log.
//!
//! The analyzer only sees the log text, never the enrichment results, so it
//! can be run again later on an old `_results.txt` file.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::runlog::markers;

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\] ").unwrap());
static PAPER_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+/\d+\]").unwrap());
static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:Authors|Abstract) confidence: (\d+)%").unwrap());
static HTTP_STATUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"HTTP (\d{3})").unwrap());

/// Per-field confidence counts, bucketed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfidenceBuckets {
    /// 90 and above.
    pub high: usize,
    /// 70 to 89.
    pub medium: usize,
    /// Below 70.
    pub low: usize,
}

impl ConfidenceBuckets {
    fn record(&mut self, confidence: u32) {
        match confidence {
            90.. => self.high += 1,
            70..=89 => self.medium += 1,
            _ => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Aggregate counts for one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Paper headers seen, including skipped records.
    pub total_papers: usize,
    /// Records without a title that were passed through.
    pub skipped: usize,
    pub resolution_attempts: usize,
    pub resolution_successes: usize,
    pub resolution_failures: usize,
    /// HTTP status codes among resolution failures.
    pub failure_statuses: BTreeMap<u16, usize>,
    pub fallback_attempts: usize,
    pub fallback_successes: usize,
    /// Papers for which neither stage produced data.
    pub complete_failures: usize,
    pub review_needed: usize,
    pub confidence: ConfidenceBuckets,
}

/// `part` as a percentage of `whole`; `None` when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

impl RunStats {
    /// Papers that went through the pipeline (not skipped).
    pub fn enriched_papers(&self) -> usize {
        self.total_papers.saturating_sub(self.skipped)
    }

    /// Papers that received at least some data.
    pub fn data_extracted(&self) -> usize {
        self.enriched_papers().saturating_sub(self.complete_failures)
    }

    pub fn resolution_success_rate(&self) -> Option<f64> {
        percent(self.resolution_successes, self.resolution_attempts)
    }

    pub fn resolution_failure_rate(&self) -> Option<f64> {
        percent(self.resolution_failures, self.resolution_attempts)
    }

    pub fn fallback_success_rate(&self) -> Option<f64> {
        percent(self.fallback_successes, self.fallback_attempts)
    }

    pub fn complete_failure_rate(&self) -> Option<f64> {
        percent(self.complete_failures, self.total_papers)
    }

    pub fn review_rate(&self) -> Option<f64> {
        percent(self.review_needed, self.total_papers)
    }

    pub fn data_extracted_rate(&self) -> Option<f64> {
        percent(self.data_extracted(), self.total_papers)
    }
}

/// Compute statistics from the text of a results log.
pub fn analyze_log(content: &str) -> RunStats {
    let mut stats = RunStats::default();

    for line in content.lines() {
        let message = match TIMESTAMP_RE.find(line) {
            Some(m) => &line[m.end()..],
            None => line,
        };

        if PAPER_HEADER_RE.is_match(message) {
            stats.total_papers += 1;
        } else if message.starts_with(markers::NO_TITLE) {
            stats.skipped += 1;
        } else if message.starts_with(markers::RESOLUTION_ATTEMPT) {
            stats.resolution_attempts += 1;
        } else if message.starts_with(markers::RESOLVED) {
            stats.resolution_successes += 1;
        } else if message.starts_with(markers::RESOLUTION_FAILED) {
            stats.resolution_failures += 1;
            if let Some(code) = HTTP_STATUS_RE
                .captures(message)
                .and_then(|c| c[1].parse::<u16>().ok())
            {
                *stats.failure_statuses.entry(code).or_insert(0) += 1;
            }
        } else if message.starts_with(markers::FALLBACK) {
            stats.fallback_attempts += 1;
        } else if message.starts_with(markers::FALLBACK_SUCCESS) {
            stats.fallback_successes += 1;
        } else if message.starts_with(markers::NO_RESULTS) {
            stats.complete_failures += 1;
        } else if message.starts_with(markers::REVIEW_NEEDED) {
            stats.review_needed += 1;
        } else if let Some(c) = CONFIDENCE_RE.captures(message) {
            if let Ok(value) = c[1].parse::<u32>() {
                stats.confidence.record(value);
            }
        }
    }

    stats
}

/// Read and analyze a results log file.
///
/// Returns `None` (after logging) if the file cannot be read; analysis never
/// fails a run.
pub fn analyze_file(path: &Path) -> Option<RunStats> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let stats = analyze_log(&content);
            tracing::info!(
                path = %path.display(),
                papers = stats.total_papers,
                "analysis complete"
            );
            Some(stats)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read results file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
PROCESSING STARTED: 2024-05-01 10:00:00.000000
================================================================================

[10:00:00] Starting to enrich references with DOI-first approach...
[10:00:00] Found 4 papers to process
[10:00:00] [1/4] ==================================================
[10:00:00] Processing: Graph Learning at Scale...
[10:00:00] DOI: 10.1/xyz
[10:00:00] Attempting authoritative resolution for DOI 10.1/xyz
[10:00:01] DOI resolved to: https://pub.example/xyz
[10:00:01] Authors confidence: 100%
[10:00:01] Abstract confidence: 90%
[10:00:01] Final confidence scores - Authors: 100%, Abstract: 90%, Webpage: 95%
[10:00:02] [2/4] ==================================================
[10:00:02] Processing: Another Paper...
[10:00:02] Attempting authoritative resolution for DOI 10.2/abc
[10:00:03] DOI resolution failed: HTTP 404
[10:00:03] Falling back to web search...
[10:00:03] Trying search result 1: Another Paper...
[10:00:04] Fallback extraction successful
[10:00:04] Abstract confidence: 60%
[10:00:04] [REVIEW NEEDED] Low confidence or errors detected
[10:00:04] Errors: DOI resolution failed: HTTP 404
[10:00:05] [3/4] ==================================================
[10:00:05] ERROR: No title found, skipping paper
[10:00:06] [4/4] ==================================================
[10:00:06] Processing: Third Paper...
[10:00:06] Attempting authoritative resolution for DOI 10.3/def
[10:00:07] DOI resolved to: https://pub.example/def
[10:00:07] DOI page metadata extraction failed
[10:00:07] Falling back to web search...
[10:00:08] No search results found
[10:00:08] [REVIEW NEEDED] Low confidence or errors detected
[10:00:08] Errors: DOI page metadata extraction failed; No search results found";

    #[test]
    fn counts_markers() {
        let s = analyze_log(SAMPLE);
        assert_eq!(s.total_papers, 4);
        assert_eq!(s.skipped, 1);
        assert_eq!(s.resolution_attempts, 3);
        assert_eq!(s.resolution_successes, 2);
        assert_eq!(s.resolution_failures, 1);
        assert_eq!(s.failure_statuses.get(&404), Some(&1));
        assert_eq!(s.fallback_attempts, 2);
        assert_eq!(s.fallback_successes, 1);
        assert_eq!(s.complete_failures, 1);
        assert_eq!(s.review_needed, 2);
        assert_eq!(
            s.confidence,
            ConfidenceBuckets {
                high: 2,
                medium: 0,
                low: 1
            }
        );
    }

    #[test]
    fn errors_summary_lines_are_not_double_counted() {
        let s = analyze_log(SAMPLE);
        // "Errors: DOI resolution failed: HTTP 404" must not add a failure
        assert_eq!(s.resolution_failures, 1);
        assert_eq!(s.complete_failures, 1);
    }

    #[test]
    fn resolution_success_rate_two_of_three() {
        let s = analyze_log(SAMPLE);
        let rate = s.resolution_success_rate().unwrap();
        assert!((rate - 66.666).abs() < 0.01, "rate = {rate}");
        assert_eq!(format!("{:.1}", rate), "66.7");
    }

    #[test]
    fn derived_counts() {
        let s = analyze_log(SAMPLE);
        assert_eq!(s.enriched_papers(), 3);
        assert_eq!(s.data_extracted(), 2);
        assert_eq!(s.complete_failure_rate(), Some(25.0));
        assert_eq!(s.review_rate(), Some(50.0));
    }

    #[test]
    fn empty_log_has_no_rates() {
        let s = analyze_log("");
        assert_eq!(s, RunStats::default());
        assert_eq!(s.resolution_success_rate(), None);
        assert_eq!(s.review_rate(), None);
    }

    #[test]
    fn lines_without_timestamps_are_accepted() {
        let s = analyze_log("Attempting authoritative resolution for DOI x\nDOI resolved to: y");
        assert_eq!(s.resolution_attempts, 1);
        assert_eq!(s.resolution_successes, 1);
    }

    #[test]
    fn confidence_buckets_boundaries() {
        let log = "Authors confidence: 90%\nAuthors confidence: 89%\nAbstract confidence: 70%\nAbstract confidence: 69%";
        let s = analyze_log(log);
        assert_eq!(
            s.confidence,
            ConfidenceBuckets {
                high: 1,
                medium: 2,
                low: 1
            }
        );
    }

    #[test]
    fn unreadable_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(analyze_file(&dir.path().join("missing_results.txt")).is_none());
    }
}
