//! In-memory doubles for the capability traits, shared by unit tests.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use patchwatch_common::{
    ClassificationOracle, CommitRecord, CommitSummary, IssueDraft, OracleError,
    PullRequestContext, RepositoryHost, RepositoryIdentity, Verdict,
};

pub fn repo(s: &str) -> RepositoryIdentity {
    s.parse().unwrap()
}

/// A summary whose sha is `id` padded to look like a commit hash.
pub fn summary(id: &str) -> CommitSummary {
    CommitSummary {
        sha: sha(id),
        message: format!("commit {}", id),
        author: "dev".into(),
        timestamp: None,
        url: format!("https://github.com/o/r/commit/{}", sha(id)),
    }
}

/// `"c4"` -> `"c4c4c4c4..."` (40 hex-ish chars; `c` and digits are hex).
pub fn sha(id: &str) -> String {
    id.repeat(40 / id.len().max(1) + 1)[..40].to_string()
}

#[derive(Default)]
pub struct FakeHost {
    commits: Mutex<HashMap<String, Vec<CommitSummary>>>,
    prs: HashMap<String, PullRequestContext>,
    failing_list: HashSet<String>,
    failing_diff: HashSet<String>,
    failing_pr: HashSet<String>,
    failing_issues: bool,
    pub list_calls: Mutex<Vec<(String, usize)>>,
    pub issue_attempts: Mutex<Vec<IssueDraft>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a repository's history, newest first, by short ids.
    pub fn with_history(self, repo: &str, ids: &[&str]) -> Self {
        self.set_history(repo, ids);
        self
    }

    /// Replace history in place (simulates pushes between runs).
    pub fn set_history(&self, repo: &str, ids: &[&str]) {
        self.commits
            .lock()
            .unwrap()
            .insert(repo.to_string(), ids.iter().map(|id| summary(id)).collect());
    }

    pub fn with_pr(mut self, id: &str, number: u64) -> Self {
        self.prs.insert(
            sha(id),
            PullRequestContext {
                number,
                title: format!("PR {}", number),
                body: None,
                url: format!("https://github.com/o/r/pull/{}", number),
                labels: vec![],
                merged_at: None,
            },
        );
        self
    }

    pub fn failing_list(mut self, repo: &str) -> Self {
        self.failing_list.insert(repo.to_string());
        self
    }

    pub fn failing_diff(mut self, id: &str) -> Self {
        self.failing_diff.insert(sha(id));
        self
    }

    pub fn failing_pr(mut self, id: &str) -> Self {
        self.failing_pr.insert(sha(id));
        self
    }

    pub fn failing_issues(mut self) -> Self {
        self.failing_issues = true;
        self
    }

    pub fn issue_count(&self) -> usize {
        self.issue_attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    async fn list_recent_commits(
        &self,
        repo: &RepositoryIdentity,
        limit: usize,
    ) -> Result<Vec<CommitSummary>> {
        let key = repo.state_key();
        self.list_calls.lock().unwrap().push((key.clone(), limit));
        if self.failing_list.contains(&key) {
            bail!("503 Service Unavailable listing {}", key);
        }
        let commits = self.commits.lock().unwrap();
        Ok(commits
            .get(&key)
            .map(|c| c.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_commit_diff(&self, _repo: &RepositoryIdentity, sha: &str) -> Result<String> {
        if self.failing_diff.contains(sha) {
            bail!("diff fetch failed for {}", sha);
        }
        Ok(format!("diff --git a/f b/f\n+change {}", sha))
    }

    async fn get_associated_pull_request(
        &self,
        _repo: &RepositoryIdentity,
        sha: &str,
    ) -> Result<Option<PullRequestContext>> {
        if self.failing_pr.contains(sha) {
            bail!("pulls lookup failed for {}", sha);
        }
        Ok(self.prs.get(sha).cloned())
    }

    async fn create_issue(&self, target: &RepositoryIdentity, issue: &IssueDraft) -> Result<String> {
        let mut attempts = self.issue_attempts.lock().unwrap();
        attempts.push(issue.clone());
        if self.failing_issues {
            bail!("issue creation rejected");
        }
        Ok(format!("https://github.com/{}/issues/{}", target, attempts.len()))
    }
}

#[derive(Default)]
pub struct FakeOracle {
    verdicts: HashMap<String, Verdict>,
    failures: HashMap<String, OracleError>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `verdict` for commit `id`; everything else is negative.
    pub fn with_verdict(mut self, id: &str, verdict: Verdict) -> Self {
        self.verdicts.insert(sha(id), verdict);
        self
    }

    pub fn failing(mut self, id: &str, error: OracleError) -> Self {
        self.failures.insert(sha(id), error);
        self
    }

    pub fn classified(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClassificationOracle for FakeOracle {
    async fn classify(&self, commit: &CommitRecord) -> Result<Verdict, OracleError> {
        self.calls.lock().unwrap().push(commit.sha.clone());
        if let Some(err) = self.failures.get(&commit.sha) {
            return Err(err.clone());
        }
        Ok(self
            .verdicts
            .get(&commit.sha)
            .cloned()
            .unwrap_or_else(Verdict::negative))
    }
}

/// A positive verdict with the given type.
pub fn positive(kind: &str) -> Verdict {
    Verdict {
        is_vulnerable: true,
        vulnerability_type: Some(kind.into()),
        severity: Some(patchwatch_common::Severity::High),
        description: Some(format!("{} in request handler", kind)),
        ..Verdict::default()
    }
}
