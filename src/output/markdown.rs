//! Markdown summary generation
//!
//! Renders a [`CrawlReport`] as a human-readable markdown file: run
//! metadata, totals, the visited pages, and a table of per-post outcomes.

use crate::crawler::EntryOutcome;
use crate::output::CrawlReport;
use crate::state::CrawlState;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Abandoned posts listed with their last error, at most
const MAX_FAILURES_LISTED: usize = 50;

/// Writes the markdown summary of `report` to `output_path`
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `config_hash` - Hash of the configuration the run used
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    report: &CrawlReport,
    config_hash: &str,
    output_path: &Path,
) -> io::Result<()> {
    let markdown = format_markdown_summary(report, config_hash);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport, config_hash: &str) -> String {
    let mut md = String::new();

    md.push_str("# Sluice Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        report.started_at.to_rfc3339()
    ));
    if let Some(finished) = report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!(
        "- **Page Range**: {} down to {}\n",
        report.page_max, report.page_min
    ));
    md.push_str(&format!("- **Status**: {}\n", status_label(&report.state)));
    if let CrawlState::Stopped { page, reason } = &report.state {
        md.push_str(&format!("- **Stopped On**: page {} ({})\n", page, reason));
    }
    md.push_str(&format!("- **Config Hash**: {}\n\n", config_hash));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Pages Visited**: {}\n",
        report.pages_visited.len()
    ));
    md.push_str(&format!("- **Posts Found**: {}\n", report.entries_found));
    md.push_str(&format!(
        "- **Posts Matching Keywords**: {}\n",
        report.entries_matched
    ));
    md.push_str(&format!("- **Downloaded**: {}\n", report.downloaded_count()));
    md.push_str(&format!("- **Abandoned**: {}\n", report.abandoned_count()));
    md.push_str(&format!(
        "- **Total Attempts**: {}\n",
        report.total_attempts()
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if !report.pages_visited.is_empty() {
        let pages: Vec<String> = report.pages_visited.iter().map(u32::to_string).collect();
        md.push_str("## Pages Visited\n\n");
        md.push_str(&pages.join(", "));
        md.push_str("\n\n");
    }

    // Per-post outcomes
    if !report.entries.is_empty() {
        md.push_str("## Posts\n\n");
        md.push_str("| Page | Title | Outcome | Attempts | File |\n");
        md.push_str("|------|-------|---------|----------|------|\n");

        for record in &report.entries {
            let (outcome, file) = match &record.outcome {
                EntryOutcome::Downloaded { result, .. } => {
                    ("downloaded", result.path.display().to_string())
                }
                EntryOutcome::Abandoned { .. } => ("abandoned", String::new()),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                record.page,
                escape_cell(&record.title),
                outcome,
                record.outcome.attempts(),
                escape_cell(&file)
            ));
        }
        md.push('\n');
    }

    // Failures
    let failures: Vec<_> = report
        .entries
        .iter()
        .filter_map(|record| match &record.outcome {
            EntryOutcome::Abandoned { last_error, .. } => Some((record, last_error)),
            EntryOutcome::Downloaded { .. } => None,
        })
        .collect();

    if !failures.is_empty() {
        md.push_str("## Abandoned Posts\n\n");
        for (record, last_error) in failures.iter().take(MAX_FAILURES_LISTED) {
            md.push_str(&format!(
                "- [{}]({}): {}\n",
                record.title, record.url, last_error
            ));
        }
        if failures.len() > MAX_FAILURES_LISTED {
            md.push_str(&format!(
                "\n... and {} more\n",
                failures.len() - MAX_FAILURES_LISTED
            ));
        }
        md.push('\n');
    }

    md
}

fn status_label(state: &CrawlState) -> &'static str {
    match state {
        CrawlState::Running { .. } => "running",
        CrawlState::Completed => "completed",
        CrawlState::Stopped { .. } => "stopped",
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
