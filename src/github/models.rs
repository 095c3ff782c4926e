//! GitHub REST response shapes (subset of fields we care about).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use patchwatch_common::{CommitSummary, PullRequestContext};

/// An entry from `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: GitHubCommitDetail,
    /// Linked GitHub account; null when the author email is not linked.
    pub author: Option<GitHubUser>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubCommitDetail {
    pub message: String,
    pub author: Option<GitHubGitAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubGitAuthor {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

impl From<GitHubCommit> for CommitSummary {
    fn from(c: GitHubCommit) -> Self {
        let git_author = c.commit.author;
        let author = c
            .author
            .map(|u| u.login)
            .or_else(|| git_author.as_ref().and_then(|a| a.name.clone()))
            .unwrap_or_else(|| "unknown".to_string());
        CommitSummary {
            sha: c.sha,
            message: c.commit.message,
            author,
            timestamp: git_author.and_then(|a| a.date),
            url: c.html_url,
        }
    }
}

/// An entry from `GET /repos/{owner}/{repo}/commits/{sha}/pulls`.
#[derive(Debug, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

impl From<GitHubPullRequest> for PullRequestContext {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequestContext {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            url: pr.html_url,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            merged_at: pr.merged_at,
        }
    }
}

/// Request body for `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Serialize)]
pub struct CreateIssueRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub labels: &'a [String],
}

/// The part of the created issue we keep.
#[derive(Debug, Deserialize)]
pub struct CreatedIssue {
    pub number: u64,
    pub html_url: String,
}

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
];

/// Format check only; says nothing about whether the token is active.
pub fn is_valid_github_token(token: &str) -> bool {
    !token.is_empty()
        && GITHUB_TOKEN_PREFIXES
            .iter()
            .any(|prefix| token.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_prefers_login_over_git_name() {
        let json = r#"{
            "sha": "4f2a9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b",
            "html_url": "https://github.com/o/r/commit/4f2a9c0",
            "commit": {
                "message": "Fix overflow in parser\n\nSigned-off-by: x",
                "author": {"name": "Alice Example", "email": "a@example.com", "date": "2024-05-01T12:00:00Z"}
            },
            "author": {"login": "alice", "id": 1}
        }"#;
        let commit: GitHubCommit = serde_json::from_str(json).unwrap();
        let summary = CommitSummary::from(commit);
        assert_eq!(summary.author, "alice");
        assert_eq!(summary.short_sha(), "4f2a9c0");
        assert!(summary.message.starts_with("Fix overflow"));
        assert_eq!(
            summary.timestamp.unwrap().to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_commit_falls_back_to_git_author_name() {
        let json = r#"{
            "sha": "abc",
            "html_url": "u",
            "commit": {"message": "m", "author": {"name": "Bob", "date": null}},
            "author": null
        }"#;
        let summary = CommitSummary::from(serde_json::from_str::<GitHubCommit>(json).unwrap());
        assert_eq!(summary.author, "Bob");
        assert!(summary.timestamp.is_none());
    }

    #[test]
    fn test_pull_request_conversion() {
        let json = r#"{
            "number": 42,
            "title": "Harden path handling",
            "body": null,
            "html_url": "https://github.com/o/r/pull/42",
            "labels": [{"name": "security"}, {"name": "bug"}],
            "merged_at": "2024-05-02T08:30:00Z",
            "state": "closed"
        }"#;
        let pr: GitHubPullRequest = serde_json::from_str(json).unwrap();
        let ctx = PullRequestContext::from(pr);
        assert_eq!(ctx.number, 42);
        assert_eq!(ctx.labels, vec!["security", "bug"]);
        assert!(ctx.body.is_none());
        assert!(ctx.merged_at.is_some());
    }

    #[test]
    fn test_create_issue_request_serializes_labels() {
        let labels = vec!["security".to_string()];
        let body = serde_json::to_value(CreateIssueRequest {
            title: "t",
            body: "b",
            labels: &labels,
        })
        .unwrap();
        assert_eq!(body["labels"][0], "security");
    }

    #[test]
    fn test_token_prefixes() {
        assert!(is_valid_github_token("ghp_abc123"));
        assert!(is_valid_github_token("github_pat_abc"));
        assert!(is_valid_github_token("ghs_xyz"));
        assert!(!is_valid_github_token(""));
        assert!(!is_valid_github_token("GHP_abc"));
        assert!(!is_valid_github_token(" ghp_abc"));
    }
}
