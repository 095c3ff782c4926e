//! One monitoring cycle: `patchwatch run`.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::info;

use patchwatch::classifier::LlmClassifier;
use patchwatch::config::{CliOverrides, Config};
use patchwatch::errors::RunError;
use patchwatch::github::GitHubClient;
use patchwatch::issues::IssueEmitter;
use patchwatch::orchestrator::{RunOrchestrator, RunOutput, RunSettings};
use patchwatch::patchwatch_config::CheckpointMode;
use patchwatch::state::StateStore;
use patchwatch::ui;

pub struct RunArgs {
    pub repos: Vec<String>,
    pub max_commits: Option<usize>,
    pub create_issues: Option<bool>,
    pub model: Option<String>,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// Everything that can abort the run happens before the first repository
/// is touched: configuration, the state lock, and client construction.
pub async fn cmd_run(project_dir: &Path, args: &RunArgs) -> Result<(), RunError> {
    let overrides = CliOverrides {
        repositories: args.repos.clone(),
        max_commits: args.max_commits,
        create_issues: args.create_issues,
        model: args.model.clone(),
    };
    let config = Config::load(project_dir, &overrides)?;

    let store = StateStore::new(&config.state_file);
    let _lock = if args.dry_run {
        None
    } else {
        Some(store.lock()?)
    };

    let host = GitHubClient::new(&config.github.api_url, &config.github.token)?
        .with_max_diff_chars(config.classifier.max_diff_chars);
    let oracle = LlmClassifier::new(&config.classifier)?;
    info!(model = %oracle.model(), repositories = config.repositories.len(), "Clients ready");

    let mut state = store.load(&config.repositories);

    let mut orchestrator =
        RunOrchestrator::new(&host, &oracle, RunSettings::from_config(&config, args.dry_run));
    if let Some(issues) = &config.issues {
        orchestrator = orchestrator.with_issues(IssueEmitter::from_settings(issues));
    }
    let checkpoint = match config.checkpoint {
        CheckpointMode::PerRepository => Some(&store),
        CheckpointMode::EndOfRun => None,
    };

    let output = orchestrator
        .run(&config.repositories, &mut state, checkpoint)
        .await;

    let saved = if args.dry_run {
        Ok(())
    } else {
        store.save(&state)
    };

    report(&output, args)?;

    saved.context("Failed to save watermark state; the next run will repeat this run's work")?;
    Ok(())
}

fn report(output: &RunOutput, args: &RunArgs) -> anyhow::Result<()> {
    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(output).context("Failed to serialize run output")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run output to {}", path.display()))?;
        info!(path = %path.display(), "Wrote run output");
    }

    if args.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialize run output")?;
        println!("{}", json);
    } else {
        ui::print_run_summary(output);
    }
    Ok(())
}
