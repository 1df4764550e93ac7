//! Markdown report generation
//!
//! Renders one sync run (counts, extracted items, errors) as a human-readable
//! markdown document.

use crate::output::{duration_seconds, OutputResult};
use crate::storage::RunRecord;
use crate::sync::SyncReport;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report of a run to `output_path`
pub fn write_markdown_report(
    report: &SyncReport,
    run: Option<&RunRecord>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(report, run);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run as markdown
///
/// `run` is `None` for dry runs, which are not recorded.
pub fn format_markdown_report(report: &SyncReport, run: Option<&RunRecord>) -> String {
    let mut md = String::new();

    md.push_str("# Tour Catalog Sync Report\n\n");

    md.push_str("## Run Information\n\n");
    match run {
        Some(run) => {
            md.push_str(&format!("- **Run ID**: {}\n", run.id));
            md.push_str(&format!("- **Started**: {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                md.push_str(&format!("- **Finished**: {}\n", finished));
            }
            if let Some(seconds) = duration_seconds(&run.started_at, run.finished_at.as_deref()) {
                md.push_str(&format!("- **Duration**: {} seconds\n", seconds));
            }
            md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
            md.push_str(&format!("- **Config Hash**: {}\n\n", run.config_hash));
        }
        None => md.push_str("- **Mode**: dry run (nothing written)\n\n"),
    }

    md.push_str("## Reconciliation\n\n");
    md.push_str("| Action | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Created | {} |\n", report.created));
    md.push_str(&format!("| Updated | {} |\n", report.updated));
    md.push_str(&format!("| Archived | {} |\n", report.archived));
    md.push_str(&format!("| Errors | {} |\n\n", report.errors.len()));

    if !report.items.is_empty() {
        md.push_str(&format!("## Items ({})\n\n", report.items.len()));
        md.push_str("| Tour | Departures |\n");
        md.push_str("|------|------------|\n");
        for item in &report.items {
            md.push_str(&format!(
                "| {} | {} |\n",
                item.name.replace('|', "\\|"),
                item.schedule_count
            ));
        }
        md.push('\n');

        let undated = report.items.iter().filter(|i| i.schedule_count == 0).count();
        if undated > 0 {
            md.push_str(&format!(
                "{} item(s) had no recognizable departure dates.\n\n",
                undated
            ));
        }
    }

    if !report.errors.is_empty() {
        md.push_str("## Errors\n\n");
        for error in &report.errors {
            md.push_str(&format!("- {}\n", error));
        }
        md.push('\n');
    }

    md
}
