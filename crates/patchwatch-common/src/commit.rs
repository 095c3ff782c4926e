//! Commit and pull-request records handed to the classifier.
//!
//! These are ephemeral: built per fetch, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit as listed by the host, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub url: String,
}

impl CommitSummary {
    /// First seven characters of the commit id.
    pub fn short_sha(&self) -> &str {
        short_sha(&self.sha)
    }
}

/// Pull request associated with a commit (the first match only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestContext {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// A commit enriched with its diff and pull-request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub url: String,
    pub diff: String,
    /// True when `diff` was cut to the configured size bound.
    pub diff_truncated: bool,
    pub pull_request: Option<PullRequestContext>,
}

impl CommitRecord {
    /// Build a record from a listed commit, bounding the diff to `max_diff_chars`.
    pub fn enrich(
        summary: CommitSummary,
        diff: String,
        max_diff_chars: usize,
        pull_request: Option<PullRequestContext>,
    ) -> Self {
        let (diff, diff_truncated) = bound_chars(diff, max_diff_chars);
        Self {
            sha: summary.sha,
            message: summary.message,
            author: summary.author,
            timestamp: summary.timestamp,
            url: summary.url,
            diff,
            diff_truncated,
            pull_request,
        }
    }

    pub fn short_sha(&self) -> &str {
        short_sha(&self.sha)
    }

    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

/// First seven characters of a commit id, or the whole id if shorter.
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(7) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
fn bound_chars(mut text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            text.truncate(idx);
            (text, true)
        }
        None => (text, false),
    }
}
