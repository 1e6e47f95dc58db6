use std::time::Duration;

use crate::orchestrator::BatchSummary;

// ============================================================================
// Console reporter: batch outcome for the terminal
// ============================================================================

/// Format the outcome of a batch crawl for terminal output.
///
/// Produces output like:
/// ```text
/// === Crawl: OS over 3 app(s) ===
///
/// ✓ FOUND     com.example.one
/// · NONE      com.example.two
/// ✗ FAILED    com.example.three
///     driver error (tap): bridge closed
///
/// === Results: 1 found, 1 without match, 1 failed in 12.3s ===
/// ```
pub fn format_batch_report(label: &str, summary: &BatchSummary, elapsed: Option<Duration>) -> String {
    let total = summary.delivered.len() + summary.not_found.len() + summary.failed.len();
    let mut out = String::new();

    out.push_str(&format!("=== Crawl: {} over {} app(s) ===\n\n", label, total));

    for app_id in &summary.delivered {
        out.push_str(&format!("\u{2713} FOUND     {}\n", app_id));
    }
    for app_id in &summary.not_found {
        out.push_str(&format!("\u{00b7} NONE      {}\n", app_id));
    }
    for (app_id, error) in &summary.failed {
        out.push_str(&format!("\u{2717} FAILED    {}\n    {}\n", app_id, error));
    }

    out.push_str(&format!(
        "\n=== Results: {} found, {} without match, {} failed",
        summary.delivered.len(),
        summary.not_found.len(),
        summary.failed.len()
    ));

    if let Some(elapsed) = elapsed {
        out.push_str(&format!(" in {:.1}s", elapsed.as_secs_f64()));
    }

    out.push_str(" ===\n");
    out
}
