//! Reading reference blocks and writing enriched ones.
//!
//! A document is a sequence of blocks separated by a blank line. Each block
//! holds `Label: value` lines; only the labels below are recognized.

use crate::{EnrichmentResult, ScoredField};

/// Separator between blocks in both input and output documents.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// A paper parsed from one input block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperRecord {
    pub doi: Option<String>,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub year: Option<String>,
    pub webpage: Option<String>,
}

impl PaperRecord {
    /// Parse the recognized `Label: value` lines of a block.
    ///
    /// Empty values are treated as absent; a later line wins over an earlier
    /// one with the same label.
    pub fn parse(block: &str) -> Self {
        let mut record = PaperRecord::default();
        for line in block.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let value = (!value.is_empty()).then(|| value.to_string());
            match label.trim() {
                "DOI" => record.doi = value,
                "Title" => record.title = value,
                "Authors" => record.authors = value,
                "Year" => record.year = value,
                "Webpage" => record.webpage = value,
                _ => {}
            }
        }
        record
    }

    /// A record can only be enriched when it has a title.
    pub fn is_enrichable(&self) -> bool {
        self.title.is_some()
    }
}

/// Split a document into its non-blank blocks.
pub fn split_blocks(content: &str) -> Vec<&str> {
    content
        .split(BLOCK_SEPARATOR)
        .filter(|b| !b.trim().is_empty())
        .collect()
}

/// Join blocks back into a document.
pub fn join_blocks<S: AsRef<str>>(blocks: &[S]) -> String {
    blocks
        .iter()
        .map(|b| b.as_ref())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Append the enrichment lines for `result` to the original block.
pub fn render_enriched(block: &str, result: &EnrichmentResult) -> String {
    let mut out = block.trim().to_string();

    fn push_scored(out: &mut String, label: &str, confidence_label: &str, field: &ScoredField) {
        out.push_str(&format!("\n{}: {}", label, field.value));
        out.push_str(&format!("\n{}: {}%", confidence_label, field.confidence));
    }

    if let Some(ref authors) = result.authors {
        push_scored(&mut out, "Authors", "Author_Confidence", authors);
    }
    if let Some(ref abstract_text) = result.abstract_text {
        push_scored(&mut out, "Abstract", "Abstract_Confidence", abstract_text);
    }
    if let Some(ref webpage) = result.webpage {
        push_scored(&mut out, "Webpage", "Webpage_Confidence", webpage);
    }

    out.push_str(&format!("\nSource_Method: {}", result.source_method));
    out.push_str(&format!(
        "\nNeeds_Review: {}",
        if result.needs_review { "True" } else { "False" }
    ));
    if !result.errors.is_empty() {
        out.push_str(&format!("\nErrors: {}", result.errors.join("; ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceMethod;

    #[test]
    fn parses_known_labels() {
        let block = "DOI: 10.1/xyz\nTitle: Graph Learning at Scale\nYear: 2021\nVenue: KDD\nWebpage: https://x.org\nAuthors: A. Smith";
        let r = PaperRecord::parse(block);
        assert_eq!(r.doi.as_deref(), Some("10.1/xyz"));
        assert_eq!(r.title.as_deref(), Some("Graph Learning at Scale"));
        assert_eq!(r.year.as_deref(), Some("2021"));
        assert_eq!(r.webpage.as_deref(), Some("https://x.org"));
        assert_eq!(r.authors.as_deref(), Some("A. Smith"));
    }

    #[test]
    fn title_keeps_inner_colons() {
        let r = PaperRecord::parse("Title: ReCon: Revealing Leaks");
        assert_eq!(r.title.as_deref(), Some("ReCon: Revealing Leaks"));
    }

    #[test]
    fn empty_title_is_not_enrichable() {
        let r = PaperRecord::parse("DOI: 10.1/xyz\nTitle:   ");
        assert!(r.title.is_none());
        assert!(!r.is_enrichable());
    }

    #[test]
    fn split_drops_blank_blocks() {
        let doc = "Title: A\n\n\n\nTitle: B\n\n   \n\nTitle: C\n";
        let blocks = split_blocks(doc);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], "Title: A");
    }

    #[test]
    fn join_preserves_block_count() {
        let doc = "Title: A\n\nTitle: B\n\nTitle: C";
        let blocks = split_blocks(doc);
        let joined = join_blocks(&blocks);
        assert_eq!(split_blocks(&joined).len(), 3);
    }

    #[test]
    fn renders_fields_in_order() {
        let result = EnrichmentResult {
            authors: Some(ScoredField::new("A. Smith, B. Lee", 100)),
            abstract_text: Some(ScoredField::new("Some abstract", 90)),
            webpage: Some(ScoredField::new("https://pub.example/xyz", 95)),
            source_method: SourceMethod::DoiDirect,
            needs_review: false,
            errors: vec![],
        };
        let out = render_enriched("DOI: 10.1/xyz\nTitle: T\n", &result);
        assert_eq!(
            out,
            "DOI: 10.1/xyz\nTitle: T\n\
             Authors: A. Smith, B. Lee\nAuthor_Confidence: 100%\n\
             Abstract: Some abstract\nAbstract_Confidence: 90%\n\
             Webpage: https://pub.example/xyz\nWebpage_Confidence: 95%\n\
             Source_Method: DOI_DIRECT\nNeeds_Review: False"
        );
    }

    #[test]
    fn renders_errors_and_none_source() {
        let result = EnrichmentResult {
            needs_review: true,
            errors: vec!["DOI resolution failed: HTTP 404".into(), "No search results found".into()],
            ..Default::default()
        };
        let out = render_enriched("Title: T", &result);
        assert_eq!(
            out,
            "Title: T\nSource_Method: NONE\nNeeds_Review: True\n\
             Errors: DOI resolution failed: HTTP 404; No search results found"
        );
    }
}
