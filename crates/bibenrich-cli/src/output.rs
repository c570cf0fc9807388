use std::io::Write;

use bibenrich_core::analyzer::percent;
use bibenrich_core::{EnrichReport, RunStats};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// `" (12.5%)"`, or nothing when the denominator is zero.
fn pct(part: usize, whole: usize) -> String {
    percent(part, whole)
        .map(|p| format!(" ({:.1}%)", p))
        .unwrap_or_default()
}

fn heading(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", title.bold())
    } else {
        writeln!(w, "{}", title)
    }
}

/// Print where the run wrote its files and how many blocks it touched.
pub fn print_report(
    w: &mut dyn Write,
    report: &EnrichReport,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Enrichment complete".green().bold())?;
    } else {
        writeln!(w, "Enrichment complete")?;
    }
    writeln!(
        w,
        "  Papers: {} ({} enriched, {} skipped without title)",
        report.papers, report.enriched, report.skipped
    )?;
    writeln!(w, "  Output: {}", report.output_path.display())?;
    writeln!(w, "  Log:    {}", report.log_path.display())?;
    if report.stats.is_none() {
        let msg = "Results log could not be read back; no statistics available";
        if color.enabled() {
            writeln!(w, "{} {}", "WARNING:".yellow(), msg)?;
        } else {
            writeln!(w, "WARNING: {}", msg)?;
        }
    }
    Ok(())
}

/// Print the run statistics in report sections.
pub fn print_stats(w: &mut dyn Write, stats: &RunStats, color: ColorMode) -> std::io::Result<()> {
    let total = stats.total_papers;

    writeln!(w)?;
    if color.enabled() {
        writeln!(
            w,
            "{}",
            format!("PROCESSING STATISTICS FOR ALL {} PAPERS", total).bold()
        )?;
    } else {
        writeln!(w, "PROCESSING STATISTICS FOR ALL {} PAPERS", total)?;
    }
    writeln!(w, "{}", "=".repeat(60))?;
    writeln!(w, "Total papers processed: {}", total)?;
    if stats.skipped > 0 {
        writeln!(w, "Skipped (no title): {}", stats.skipped)?;
    }
    writeln!(w)?;

    if stats.resolution_attempts > 0 {
        heading(w, "DOI RESOLUTION:", color)?;
        writeln!(w, "  DOI attempts: {}", stats.resolution_attempts)?;
        writeln!(
            w,
            "  DOI successes: {}{}",
            stats.resolution_successes,
            pct(stats.resolution_successes, stats.resolution_attempts)
        )?;
        writeln!(
            w,
            "  DOI failures: {}{}",
            stats.resolution_failures,
            pct(stats.resolution_failures, stats.resolution_attempts)
        )?;
        for (status, count) in &stats.failure_statuses {
            writeln!(w, "    - HTTP {}: {}", status, count)?;
        }
        writeln!(w)?;
    }

    if stats.fallback_attempts > 0 {
        heading(w, "FALLBACK PERFORMANCE:", color)?;
        writeln!(w, "  Web search fallback used: {}", stats.fallback_attempts)?;
        writeln!(
            w,
            "  Fallback successes: {}{}",
            stats.fallback_successes,
            pct(stats.fallback_successes, stats.fallback_attempts)
        )?;
        writeln!(
            w,
            "  Complete failures: {}{}",
            stats.complete_failures,
            pct(stats.complete_failures, total)
        )?;
        writeln!(w)?;
    }

    if stats.confidence.total() > 0 {
        let c = &stats.confidence;
        let fields = c.total();
        heading(w, "CONFIDENCE DISTRIBUTION:", color)?;
        if color.enabled() {
            writeln!(w, "  {} (>= 90%): {}{}", "High".green(), c.high, pct(c.high, fields))?;
            writeln!(w, "  {} (70-89%): {}{}", "Medium".yellow(), c.medium, pct(c.medium, fields))?;
            writeln!(w, "  {} (< 70%): {}{}", "Low".red(), c.low, pct(c.low, fields))?;
        } else {
            writeln!(w, "  High (>= 90%): {}{}", c.high, pct(c.high, fields))?;
            writeln!(w, "  Medium (70-89%): {}{}", c.medium, pct(c.medium, fields))?;
            writeln!(w, "  Low (< 70%): {}{}", c.low, pct(c.low, fields))?;
        }
        writeln!(w)?;
    }

    if total > 0 {
        heading(w, "REVIEW REQUIREMENTS:", color)?;
        writeln!(
            w,
            "  Papers needing review: {}{}",
            stats.review_needed,
            pct(stats.review_needed, total)
        )?;
        writeln!(w)?;

        heading(w, "OVERALL SUCCESS:", color)?;
        writeln!(
            w,
            "  Some data extracted: {}{}",
            stats.data_extracted(),
            pct(stats.data_extracted(), total)
        )?;
        if color.enabled() && stats.complete_failures > 0 {
            writeln!(
                w,
                "  Complete failures: {}{}",
                stats.complete_failures.red(),
                pct(stats.complete_failures, total)
            )?;
        } else {
            writeln!(
                w,
                "  Complete failures: {}{}",
                stats.complete_failures,
                pct(stats.complete_failures, total)
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibenrich_core::ConfidenceBuckets;

    fn sample_stats() -> RunStats {
        let mut stats = RunStats {
            total_papers: 4,
            skipped: 1,
            resolution_attempts: 3,
            resolution_successes: 2,
            resolution_failures: 1,
            fallback_attempts: 2,
            fallback_successes: 1,
            complete_failures: 1,
            review_needed: 2,
            confidence: ConfidenceBuckets {
                high: 2,
                medium: 0,
                low: 1,
            },
            ..Default::default()
        };
        stats.failure_statuses.insert(404, 1);
        stats
    }

    fn render(stats: &RunStats) -> String {
        let mut buf = Vec::new();
        print_stats(&mut buf, stats, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn stats_sections_without_color() {
        let text = render(&sample_stats());
        assert!(text.contains("PROCESSING STATISTICS FOR ALL 4 PAPERS"));
        assert!(text.contains("  DOI successes: 2 (66.7%)"));
        assert!(text.contains("    - HTTP 404: 1"));
        assert!(text.contains("  Fallback successes: 1 (50.0%)"));
        assert!(text.contains("  Papers needing review: 2 (50.0%)"));
        assert!(text.contains("  Some data extracted: 2 (50.0%)"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn empty_stats_print_only_header() {
        let text = render(&RunStats::default());
        assert!(text.contains("Total papers processed: 0"));
        assert!(!text.contains("DOI RESOLUTION"));
        assert!(!text.contains("OVERALL SUCCESS"));
    }

    #[test]
    fn colored_output_has_escapes() {
        let mut buf = Vec::new();
        print_stats(&mut buf, &sample_stats(), ColorMode(true)).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains('\u{1b}'));
    }
}
