//! Source-control host capability.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::commit::{CommitSummary, PullRequestContext};
use crate::identity::RepositoryIdentity;

/// A rendered tracking issue, ready to be created on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Abstraction over the hosting API for testability.
/// Real implementation: `GitHubClient`. Test double: `FakeHost`.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Up to `limit` commits on the default branch, newest first.
    /// An empty repository yields an empty list, not an error.
    async fn list_recent_commits(
        &self,
        repo: &RepositoryIdentity,
        limit: usize,
    ) -> Result<Vec<CommitSummary>>;

    async fn get_commit_diff(&self, repo: &RepositoryIdentity, sha: &str) -> Result<String>;

    /// The first pull request associated with `sha`, if any.
    async fn get_associated_pull_request(
        &self,
        repo: &RepositoryIdentity,
        sha: &str,
    ) -> Result<Option<PullRequestContext>>;

    /// Create an issue on `target` and return its URL.
    async fn create_issue(&self, target: &RepositoryIdentity, issue: &IssueDraft)
    -> Result<String>;
}
