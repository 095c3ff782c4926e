use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use patchwatch_common::Verdict;

/// What happened to one repository during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepositoryOutcome {
    /// First run for this repository; watermark set to the current head.
    Initialized { watermark: String },
    /// No commits newer than the watermark.
    UpToDate,
    Processed {
        commits: usize,
        previous: Option<String>,
        watermark: String,
    },
    /// Watermark left unchanged.
    Failed { error: String },
}

impl RepositoryOutcome {
    /// True when the repository's watermark moved this run.
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Initialized { .. } | Self::Processed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryReport {
    pub repository: String,
    #[serde(flatten)]
    pub outcome: RepositoryOutcome,
}

/// A positive verdict, with where it came from and where it was filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub repository: String,
    pub commit_sha: String,
    pub commit_url: String,
    pub commit_message: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<u64>,
    pub verdict: Verdict,
    /// `None` when issue creation is disabled, skipped, or failed.
    pub issue_url: Option<String>,
}

/// Result of one monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub commits_analyzed: usize,
    pub vulnerabilities_found: usize,
    pub issues_created: usize,
    pub classification_errors: usize,
    pub repositories: Vec<RepositoryReport>,
    /// Positive verdicts in the order they were produced.
    pub detections: Vec<Detection>,
}

impl RunOutput {
    pub(crate) fn start(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            dry_run,
            commits_analyzed: 0,
            vulnerabilities_found: 0,
            issues_created: 0,
            classification_errors: 0,
            repositories: Vec::new(),
            detections: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    pub fn failed_repositories(&self) -> usize {
        self.repositories
            .iter()
            .filter(|r| matches!(r.outcome, RepositoryOutcome::Failed { .. }))
            .count()
    }

    pub fn report(&self, repository: &str) -> Option<&RepositoryOutcome> {
        self.repositories
            .iter()
            .find(|r| r.repository == repository)
            .map(|r| &r.outcome)
    }
}
