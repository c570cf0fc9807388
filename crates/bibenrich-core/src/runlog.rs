//! The per-run audit log.
//!
//! Every notable pipeline event is appended here as a timestamped line and
//! mirrored to `tracing`. The log is written next to the output file at the
//! end of the run and mined by [`crate::analyzer`] afterwards, so the marker
//! strings below are part of its format.

use std::path::Path;

use chrono::{DateTime, Local};

/// Line prefixes the analyzer looks for. Messages are written with these
/// exact prefixes so counts stay in sync with the pipeline.
pub mod markers {
    pub const RESOLUTION_ATTEMPT: &str = "Attempting authoritative resolution";
    pub const RESOLVED: &str = "DOI resolved to:";
    pub const RESOLUTION_FAILED: &str = "DOI resolution failed:";
    pub const FALLBACK: &str = "Falling back to web search";
    pub const FALLBACK_SUCCESS: &str = "Fallback extraction successful";
    pub const NO_RESULTS: &str = "No search results found";
    pub const REVIEW_NEEDED: &str = "[REVIEW NEEDED]";
    pub const NO_TITLE: &str = "ERROR: No title found";
}

/// Width of the `=` rule under the banner.
const BANNER_RULE_WIDTH: usize = 80;

/// One line of the run log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    /// `[HH:MM:SS] message`
    pub fn render(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Append-only log owned by a single enrichment run.
#[derive(Debug, Clone)]
pub struct RunLog {
    started: DateTime<Local>,
    entries: Vec<LogEntry>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::start()
    }
}

impl RunLog {
    /// Begin a new log stamped with the current time.
    pub fn start() -> Self {
        Self {
            started: Local::now(),
            entries: Vec::new(),
        }
    }

    /// Append an informational entry.
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.push(message);
    }

    /// Append an entry that also warrants a warning in the tracing output.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.push(message);
    }

    fn push(&mut self, message: String) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full log text: banner followed by one line per entry.
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "PROCESSING STARTED: {}",
                self.started.format("%Y-%m-%d %H:%M:%S%.6f")
            ),
            "=".repeat(BANNER_RULE_WIDTH),
            String::new(),
        ];
        lines.extend(self.entries.iter().map(LogEntry::render));
        lines.join("\n")
    }

    /// Write the rendered log to `path`.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;

    static LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\] .+$").unwrap());

    #[test]
    fn render_starts_with_banner() {
        let mut log = RunLog::start();
        log.info("Found 2 papers to process");
        let text = log.render();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("PROCESSING STARTED: "));
        assert_eq!(lines[1], "=".repeat(80));
        assert_eq!(lines[2], "");
        assert!(LINE_RE.is_match(lines[3]), "bad line: {}", lines[3]);
        assert!(lines[3].ends_with("Found 2 papers to process"));
    }

    #[test]
    fn entries_are_appended_in_order() {
        let mut log = RunLog::start();
        log.info("first");
        log.warn("second");
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].message, "first");
        assert_eq!(log.entries()[1].message, "second");
    }

    #[test]
    fn write_to_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_results.txt");
        let mut log = RunLog::start();
        log.info("hello");
        log.write_to(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("] hello"));
    }
}
