//! Human-readable crawl summary
//!
//! Printed by the binary at the end of a crawl unless `--quiet` is given.

use crate::output::types::CrawlResult;
use std::collections::BTreeMap;

/// Formats a crawl result as plain text
///
/// Shows the outcome counts, elapsed time, failures grouped by kind and the list of
/// failed URLs.
pub fn format_summary(result: &CrawlResult) -> String {
    let mut out = String::new();

    if result.interrupted {
        out.push_str("=== Crawl Interrupted ===\n\n");
    } else {
        out.push_str("=== Crawl Complete ===\n\n");
    }

    let attempted = result.attempted_count();
    let successful = result.successful_count();

    out.push_str("Overview:\n");
    out.push_str(&format!("  Pages attempted: {}\n", attempted));
    out.push_str(&format!("  Successful: {}\n", successful));
    out.push_str(&format!("  Failed: {}\n", result.failed_count()));
    out.push_str(&format!("  Skipped: {}\n", result.skipped_count));
    out.push_str(&format!(
        "  Elapsed: {:.1}s\n",
        result.elapsed.as_secs_f64()
    ));
    out.push('\n');

    // kind -> count, sorted by count then name
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for page in result.failed_pages() {
        *by_kind
            .entry(page.error_kind.as_deref().unwrap_or("unknown"))
            .or_default() += 1;
    }

    if !by_kind.is_empty() {
        let mut kinds: Vec<_> = by_kind.into_iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        out.push_str("Error Summary:\n");
        for (kind, count) in kinds {
            out.push_str(&format!("  {}: {}\n", kind, count));
        }
        out.push('\n');

        out.push_str("Failed URLs:\n");
        for page in result.failed_pages() {
            out.push_str(&format!(
                "  - {} ({})\n",
                page.url,
                page.error.as_deref().unwrap_or("unknown error")
            ));
        }
        out.push('\n');
    }

    let success_rate = if attempted > 0 {
        (successful as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} pages)\n",
        success_rate, successful, attempted
    ));

    out
}
