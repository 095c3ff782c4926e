use tracing::{error, info, warn};

use patchwatch_common::{
    ClassificationOracle, CommitRecord, RepositoryHost, RepositoryIdentity, Verdict,
};

use super::output::{Detection, RepositoryOutcome, RepositoryReport, RunOutput};
use crate::config::Config;
use crate::errors::RepositoryError;
use crate::frontier::{Frontier, FrontierTracker};
use crate::issues::IssueEmitter;
use crate::state::{StateStore, WatermarkState};

/// Per-run knobs, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub max_commits: usize,
    pub fetch_window: usize,
    pub max_diff_chars: usize,
    /// Classify, but create no issues and persist nothing.
    pub dry_run: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            max_commits: config.max_commits,
            fetch_window: config.fetch_window,
            max_diff_chars: config.classifier.max_diff_chars,
            dry_run,
        }
    }
}

/// Drives one monitoring cycle across all configured repositories.
///
/// Repositories are processed one at a time and commits are classified one
/// at a time, newest first. A repository that fails is reported and skipped;
/// its watermark stays where it was. A commit whose classification fails is
/// counted as negative. Each repository's watermark advances once, after its
/// whole batch has been handed to the classifier.
pub struct RunOrchestrator<'a> {
    host: &'a dyn RepositoryHost,
    oracle: &'a dyn ClassificationOracle,
    settings: RunSettings,
    issues: Option<IssueEmitter>,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(
        host: &'a dyn RepositoryHost,
        oracle: &'a dyn ClassificationOracle,
        settings: RunSettings,
    ) -> Self {
        Self {
            host,
            oracle,
            settings,
            issues: None,
        }
    }

    pub fn with_issues(mut self, emitter: IssueEmitter) -> Self {
        self.issues = Some(emitter);
        self
    }

    /// Process `repos` against `state`, mutating it in place.
    ///
    /// With `checkpoint` set, the full state is saved after every repository
    /// whose watermark moved. Otherwise the caller saves once at the end.
    /// Never fails: per-repository and per-commit errors end up in the output.
    pub async fn run(
        &self,
        repos: &[RepositoryIdentity],
        state: &mut WatermarkState,
        checkpoint: Option<&StateStore>,
    ) -> RunOutput {
        let checkpoint = checkpoint.filter(|_| !self.settings.dry_run);
        let tracker = FrontierTracker::new(
            self.host,
            self.settings.max_commits,
            self.settings.fetch_window,
            self.settings.max_diff_chars,
        );
        let mut output = RunOutput::start(self.settings.dry_run);

        info!(
            run_id = %output.run_id,
            repositories = repos.len(),
            max_commits = self.settings.max_commits,
            dry_run = self.settings.dry_run,
            "Starting run"
        );

        for repo in repos {
            let outcome = self.process_repository(&tracker, repo, state, &mut output).await;

            if outcome.advanced()
                && let Some(store) = checkpoint
                && let Err(e) = store.save(state)
            {
                warn!(repo = %repo, error = %format!("{:#}", e), "Checkpoint save failed; state will be saved at end of run");
            }

            output.repositories.push(RepositoryReport {
                repository: repo.to_string(),
                outcome,
            });
        }

        output.finish();
        info!(
            run_id = %output.run_id,
            commits = output.commits_analyzed,
            vulnerabilities = output.vulnerabilities_found,
            issues = output.issues_created,
            failed_repositories = output.failed_repositories(),
            "Run complete"
        );
        output
    }

    async fn process_repository(
        &self,
        tracker: &FrontierTracker<'_>,
        repo: &RepositoryIdentity,
        state: &mut WatermarkState,
        output: &mut RunOutput,
    ) -> RepositoryOutcome {
        let previous = state.get(repo).map(str::to_string);

        let frontier = match tracker.compute(repo, previous.as_deref()).await {
            Ok(frontier) => frontier,
            Err(e) => {
                match &e {
                    RepositoryError::NoCommitsFound { .. } => warn!(repo = %repo, "{}", e),
                    RepositoryError::HostFetch { .. } => error!(repo = %repo, "{}", e),
                }
                return RepositoryOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match frontier {
            Frontier::Initialized { watermark } => {
                state.advance(repo, &watermark);
                RepositoryOutcome::Initialized { watermark }
            }
            Frontier::Batch {
                advance_to: None, ..
            } => {
                info!(repo = %repo, "No new commits");
                RepositoryOutcome::UpToDate
            }
            Frontier::Batch {
                commits,
                advance_to: Some(newest),
            } => {
                info!(repo = %repo, count = commits.len(), "Classifying new commits");
                for commit in &commits {
                    self.classify_commit(repo, commit, output).await;
                }
                state.advance(repo, &newest);
                RepositoryOutcome::Processed {
                    commits: commits.len(),
                    previous,
                    watermark: newest,
                }
            }
        }
    }

    async fn classify_commit(
        &self,
        repo: &RepositoryIdentity,
        commit: &CommitRecord,
        output: &mut RunOutput,
    ) {
        output.commits_analyzed += 1;

        let verdict = match self.oracle.classify(commit).await {
            Ok(verdict) => verdict.normalize(),
            Err(e) => {
                output.classification_errors += 1;
                warn!(repo = %repo, sha = %commit.short_sha(), error = %e, "Classification failed; treating commit as not vulnerable");
                Verdict::negative()
            }
        };

        if !verdict.is_vulnerable {
            return;
        }

        output.vulnerabilities_found += 1;
        info!(
            repo = %repo,
            sha = %commit.short_sha(),
            kind = verdict.vulnerability_type.as_deref().unwrap_or("unspecified"),
            "Possible vulnerability fix detected"
        );

        let issue_url = self.file_issue(repo, commit, &verdict, output).await;

        output.detections.push(Detection {
            repository: repo.to_string(),
            commit_sha: commit.sha.clone(),
            commit_url: commit.url.clone(),
            commit_message: commit.message.clone(),
            author: commit.author.clone(),
            pull_request: commit.pull_request.as_ref().map(|pr| pr.number),
            verdict,
            issue_url,
        });
    }

    /// At most one creation attempt per detection; failures are logged only.
    async fn file_issue(
        &self,
        repo: &RepositoryIdentity,
        commit: &CommitRecord,
        verdict: &Verdict,
        output: &mut RunOutput,
    ) -> Option<String> {
        let emitter = self.issues.as_ref()?;
        if self.settings.dry_run {
            info!(repo = %repo, sha = %commit.short_sha(), "Dry run; not creating issue");
            return None;
        }
        let draft = emitter.render(repo, commit, verdict);
        match emitter.emit(self.host, &draft).await {
            Ok(url) => {
                output.issues_created += 1;
                Some(url)
            }
            Err(e) => {
                error!(
                    repo = %repo,
                    sha = %commit.short_sha(),
                    target = %emitter.target(),
                    error = %format!("{:#}", e),
                    "Issue creation failed; detection kept in run output"
                );
                None
            }
        }
    }
}
