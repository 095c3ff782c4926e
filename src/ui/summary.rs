//! Human-readable run and state summaries for the terminal.

use console::style;
use patchwatch_common::commit::short_sha;

use super::icons::{ALERT, CHECK, CROSS, DOT, SEARCH, SPARKLE};
use crate::orchestrator::{RepositoryOutcome, RunOutput};
use crate::state::WatermarkState;
use crate::util::one_line;

/// One line per repository, the detections, then the totals.
pub fn render_run_summary(output: &RunOutput) -> Vec<String> {
    let mut lines = Vec::new();

    let title = if output.dry_run {
        "Patchwatch run (dry run)"
    } else {
        "Patchwatch run"
    };
    lines.push(format!("{}{}", SEARCH, style(title).bold().cyan()));
    lines.push(String::new());

    for report in &output.repositories {
        let line = match &report.outcome {
            RepositoryOutcome::Initialized { watermark } => format!(
                "  {}{}  now watching from {}",
                SPARKLE,
                style(&report.repository).bold(),
                style(short_sha(watermark)).dim()
            ),
            RepositoryOutcome::UpToDate => format!(
                "  {}{}  up to date",
                CHECK,
                style(&report.repository).bold()
            ),
            RepositoryOutcome::Processed {
                commits,
                previous,
                watermark,
            } => format!(
                "  {}{}  {} new commit{} ({} -> {})",
                CHECK,
                style(&report.repository).bold(),
                commits,
                if *commits == 1 { "" } else { "s" },
                style(previous.as_deref().map(short_sha).unwrap_or("none")).dim(),
                style(short_sha(watermark)).dim()
            ),
            RepositoryOutcome::Failed { error } => format!(
                "  {}{}  {}",
                CROSS,
                style(&report.repository).bold(),
                style(one_line(error, 160)).red()
            ),
        };
        lines.push(line);
    }

    if !output.detections.is_empty() {
        lines.push(String::new());
        lines.push(format!("{}{}", ALERT, style("Detections").bold().yellow()));
        for detection in &output.detections {
            let verdict = &detection.verdict;
            let severity = verdict
                .severity
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unrated".to_string());
            let kind = verdict
                .vulnerability_type
                .as_deref()
                .unwrap_or("vulnerability");
            lines.push(format!(
                "  {}{}@{}  {} {}",
                DOT,
                detection.repository,
                short_sha(&detection.commit_sha),
                style(severity).red().bold(),
                one_line(kind, 80)
            ));
            match &detection.issue_url {
                Some(url) => lines.push(format!("      issue: {}", url)),
                None => lines.push(format!("      commit: {}", detection.commit_url)),
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Commits analyzed: {}  Vulnerabilities: {}  Issues created: {}",
        output.commits_analyzed, output.vulnerabilities_found, output.issues_created
    ));
    if output.classification_errors > 0 {
        lines.push(format!(
            "{}",
            style(format!(
                "Classification errors: {} (treated as not vulnerable)",
                output.classification_errors
            ))
            .yellow()
        ));
    }
    let failed = output.failed_repositories();
    if failed > 0 {
        lines.push(format!(
            "{}",
            style(format!("Repositories failed: {}", failed)).red()
        ));
    }
    if output.dry_run {
        lines.push(format!(
            "{}",
            style("Dry run: no issues were created and state was not saved").dim()
        ));
    }
    lines
}

pub fn print_run_summary(output: &RunOutput) {
    println!();
    for line in render_run_summary(output) {
        println!("{}", line);
    }
    println!();
}

pub fn print_watermarks(state: &WatermarkState) {
    if state.is_empty() {
        println!("No watermarks recorded yet.");
        return;
    }
    let width = state.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (repo, sha) in state.iter() {
        println!("  {:width$}  {}", repo, sha, width = width);
    }
}
