//! Heuristic confidence scoring for extracted metadata.

use serde::{Deserialize, Serialize};

use crate::{AcquisitionMethod, DataKind, ValidationFlags};

/// Score constants used by [`ConfidenceTable::calculate`] and the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTable {
    /// Base score for data read from the DOI landing page.
    pub authoritative_base: u8,
    /// Base score for data read from a search result.
    pub search_base: u8,
    pub unclassified_base: u8,
    /// Added for each validation flag that is set.
    pub per_flag_bonus: u8,
    /// Fixed confidence of a webpage reached through DOI resolution.
    pub doi_webpage: u8,
    /// Fixed confidence of a webpage taken from a search result.
    pub search_webpage: u8,
    /// Populated confidences below this mark the paper for review.
    pub review_threshold: u8,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            authoritative_base: 90,
            search_base: 60,
            unclassified_base: 30,
            per_flag_bonus: 10,
            doi_webpage: 95,
            search_webpage: 50,
            review_threshold: 70,
        }
    }
}

impl ConfidenceTable {
    /// Base score for an acquisition method.
    pub fn base(&self, method: AcquisitionMethod) -> u8 {
        match method {
            AcquisitionMethod::AuthoritativeDirect => self.authoritative_base,
            AcquisitionMethod::SearchFallback => self.search_base,
            AcquisitionMethod::Unclassified => self.unclassified_base,
        }
    }

    /// Confidence (0-100) for one piece of data.
    ///
    /// The data kind does not currently change the score; both authors and
    /// abstracts use the same table.
    pub fn calculate(
        &self,
        _kind: DataKind,
        method: AcquisitionMethod,
        flags: ValidationFlags,
    ) -> u8 {
        let score = u32::from(self.base(method)) + flags.count() * u32::from(self.per_flag_bonus);
        score.min(100) as u8
    }

    /// Fixed webpage confidence for a source method.
    pub fn webpage(&self, method: AcquisitionMethod) -> u8 {
        match method {
            AcquisitionMethod::AuthoritativeDirect => self.doi_webpage,
            AcquisitionMethod::SearchFallback => self.search_webpage,
            AcquisitionMethod::Unclassified => self.unclassified_base,
        }
        .min(100)
    }
}
