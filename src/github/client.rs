use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use patchwatch_common::{
    CommitSummary, IssueDraft, PullRequestContext, RepositoryHost, RepositoryIdentity,
};

use super::models::{
    CreateIssueRequest, CreatedIssue, GitHubCommit, GitHubPullRequest, is_valid_github_token,
};

const USER_AGENT: &str = "patchwatch";
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.diff";
/// GitHub caps `per_page` at 100.
const MAX_PER_PAGE: usize = 100;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// GitHub REST client, built once per run and shared by reference.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    /// Diff bodies are read at most this far; see [`diff_byte_cap`].
    max_diff_bytes: usize,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        if !is_valid_github_token(token) {
            warn!("GitHub token has an unrecognized prefix; continuing (GHES tokens may differ)");
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build GitHub HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            max_diff_bytes: usize::MAX,
        })
    }

    /// Stop reading a diff once it certainly exceeds `max_chars` characters.
    pub fn with_max_diff_chars(mut self, max_chars: usize) -> Self {
        self.max_diff_bytes = diff_byte_cap(max_chars);
        self
    }

    fn repo_url(&self, repo: &RepositoryIdentity, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url,
            repo.owner(),
            repo.name(),
            tail
        )
    }

    fn get(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }
}

/// Turn a non-success response into an error that carries the body.
async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    anyhow::bail!("GitHub {} returned {}: {}", what, status, body.trim())
}

/// A UTF-8 char is at most 4 bytes, so this many bytes always holds more than
/// `max_chars` chars even after a split code point is dropped.
fn diff_byte_cap(max_chars: usize) -> usize {
    max_chars.saturating_mul(4).saturating_add(4)
}

/// Decode a possibly cut diff body. A code point split by the cut is dropped;
/// other invalid bytes (binary content) are replaced.
fn decode_diff(body: Vec<u8>) -> String {
    match String::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            let utf8 = e.utf8_error();
            let mut bytes = e.into_bytes();
            if utf8.error_len().is_none() {
                bytes.truncate(utf8.valid_up_to());
            }
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn list_recent_commits(
        &self,
        repo: &RepositoryIdentity,
        limit: usize,
    ) -> Result<Vec<CommitSummary>> {
        let url = self.repo_url(repo, "/commits");
        let per_page = limit.clamp(1, MAX_PER_PAGE);
        let mut commits: Vec<CommitSummary> = Vec::with_capacity(limit);
        let mut page = 1u32;

        while commits.len() < limit {
            let resp = self
                .get(&url, JSON_MEDIA_TYPE)
                .query(&[
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .with_context(|| format!("Failed to send commits request for {}", repo))?;

            // GitHub answers 409 for a repository without any commits.
            if resp.status() == StatusCode::CONFLICT {
                debug!(repo = %repo, "Commit listing returned 409; repository is empty");
                break;
            }

            let batch: Vec<GitHubCommit> = check_status(resp, "commits API")
                .await?
                .json()
                .await
                .with_context(|| format!("Failed to parse commits response for {}", repo))?;

            let count = batch.len();
            commits.extend(batch.into_iter().map(CommitSummary::from));

            if count < per_page {
                break; // Last page
            }
            page += 1;
        }

        commits.truncate(limit);
        debug!(repo = %repo, count = commits.len(), pages = page, "Listed commits");
        Ok(commits)
    }

    async fn get_commit_diff(&self, repo: &RepositoryIdentity, sha: &str) -> Result<String> {
        let url = self.repo_url(repo, &format!("/commits/{}", sha));
        let resp = self
            .get(&url, DIFF_MEDIA_TYPE)
            .send()
            .await
            .with_context(|| format!("Failed to send diff request for {}@{}", repo, sha))?;
        let mut resp = check_status(resp, "commit diff API").await?;

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .with_context(|| format!("Failed to read diff body for {}@{}", repo, sha))?
        {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_diff_bytes {
                body.truncate(self.max_diff_bytes);
                debug!(repo = %repo, sha = %sha, bytes = self.max_diff_bytes, "Diff exceeds size bound; stopped reading");
                break;
            }
        }
        Ok(decode_diff(body))
    }

    async fn get_associated_pull_request(
        &self,
        repo: &RepositoryIdentity,
        sha: &str,
    ) -> Result<Option<PullRequestContext>> {
        let url = self.repo_url(repo, &format!("/commits/{}/pulls", sha));
        let resp = self
            .get(&url, JSON_MEDIA_TYPE)
            .send()
            .await
            .with_context(|| format!("Failed to send pulls request for {}@{}", repo, sha))?;
        let pulls: Vec<GitHubPullRequest> = check_status(resp, "commit pulls API")
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse pulls response for {}@{}", repo, sha))?;
        Ok(pulls.into_iter().next().map(PullRequestContext::from))
    }

    async fn create_issue(
        &self,
        target: &RepositoryIdentity,
        issue: &IssueDraft,
    ) -> Result<String> {
        let url = self.repo_url(target, "/issues");
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", JSON_MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&CreateIssueRequest {
                title: &issue.title,
                body: &issue.body,
                labels: &issue.labels,
            })
            .send()
            .await
            .with_context(|| format!("Failed to send issue request to {}", target))?;
        let created: CreatedIssue = check_status(resp, "issues API")
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse created issue from {}", target))?;
        debug!(target = %target, number = created.number, "Created issue");
        Ok(created.html_url)
    }
}
