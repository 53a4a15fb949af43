//! Console statistics for a finished crawl

use crate::output::CrawlReport;
use crate::state::CrawlState;

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_statistics(report: &CrawlReport) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!(
        "  Page range: {} down to {}",
        report.page_max, report.page_min
    );
    println!("  Pages visited: {}", report.pages_visited.len());
    println!("  Posts found: {}", report.entries_found);
    println!("  Posts matching keywords: {}", report.entries_matched);
    if let Some(duration) = report.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!();

    println!("Posts:");
    println!("  Downloaded: {}", report.downloaded_count());
    println!("  Abandoned: {}", report.abandoned_count());
    println!("  Attempts spent: {}", report.total_attempts());
    println!();

    match &report.state {
        CrawlState::Stopped { page, reason } => {
            println!("Stopped early on page {}: {}", page, reason);
        }
        state => println!("Traversal {}", state),
    }

    println!(
        "Success Rate: {:.1}% ({} / {} posts downloaded)",
        report.success_rate(),
        report.downloaded_count(),
        report.entries.len()
    );
}
