//! Commit frontier computation.
//!
//! Given a repository and its watermark (the newest commit already
//! processed), work out which commits are new:
//!
//! 1. List up to `fetch_window` commits, newest first.
//! 2. Walk from the newest, stopping at the watermark or after
//!    `max_commits` commits, whichever comes first.
//! 3. Enrich each collected commit with its diff and first associated PR.
//!
//! A repository without a watermark is initialized to its current head and
//! yields no commits, so a newly monitored repository's history is never
//! replayed. If the watermark is not found in the listing (history rewritten
//! or more new commits than the window holds) every listed commit up to the
//! cap is treated as new; already processed commits may then be reprocessed.
//!
//! When more new commits exist than the cap allows, the watermark still moves
//! to the newest one, so the older commits past the cap are never classified.

use tracing::{debug, info, warn};

use patchwatch_common::commit::short_sha;
use patchwatch_common::{CommitRecord, CommitSummary, RepositoryHost, RepositoryIdentity};

use crate::errors::RepositoryError;

/// What a repository needs this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frontier {
    /// First sighting: the watermark is set to the current head and nothing
    /// is classified.
    Initialized { watermark: String },
    /// Commits newer than the watermark, newest first, at most `max_commits`.
    /// `advance_to` is the newest commit in the batch, or `None` when empty.
    Batch {
        commits: Vec<CommitRecord>,
        advance_to: Option<String>,
    },
}

pub struct FrontierTracker<'a> {
    host: &'a dyn RepositoryHost,
    max_commits: usize,
    fetch_window: usize,
    max_diff_chars: usize,
}

impl<'a> FrontierTracker<'a> {
    /// `fetch_window` is raised to at least `max_commits`.
    pub fn new(
        host: &'a dyn RepositoryHost,
        max_commits: usize,
        fetch_window: usize,
        max_diff_chars: usize,
    ) -> Self {
        Self {
            host,
            max_commits,
            fetch_window: fetch_window.max(max_commits),
            max_diff_chars,
        }
    }

    pub async fn compute(
        &self,
        repo: &RepositoryIdentity,
        watermark: Option<&str>,
    ) -> Result<Frontier, RepositoryError> {
        let Some(watermark) = watermark else {
            let head = self.list(repo, 1).await?;
            let newest = head
                .into_iter()
                .next()
                .ok_or_else(|| RepositoryError::NoCommitsFound {
                    repo: repo.clone(),
                })?;
            info!(repo = %repo, sha = %newest.short_sha(), "First run; recording current head as watermark");
            return Ok(Frontier::Initialized {
                watermark: newest.sha,
            });
        };

        let listed = self.list(repo, self.fetch_window).await?;
        if listed.is_empty() {
            return Err(RepositoryError::NoCommitsFound {
                repo: repo.clone(),
            });
        }

        let selected = select_new(listed, watermark, self.max_commits);
        if selected.reached_cap {
            let newest = selected.commits.first().map_or("", |c| c.sha.as_str());
            warn!(
                repo = %repo,
                cap = self.max_commits,
                watermark = %short_sha(newest),
                "More new commits than the per-run cap; commits older than the cap will not be classified"
            );
        } else if !selected.found_watermark {
            warn!(
                repo = %repo,
                watermark = %short_sha(watermark),
                "Watermark not found in recent history; treating all fetched commits as new"
            );
        }

        let mut commits = Vec::with_capacity(selected.commits.len());
        for summary in selected.commits {
            commits.push(self.enrich(repo, summary).await?);
        }
        let advance_to = commits.first().map(|c| c.sha.clone());

        debug!(repo = %repo, new = commits.len(), "Computed frontier");
        Ok(Frontier::Batch {
            commits,
            advance_to,
        })
    }

    async fn list(
        &self,
        repo: &RepositoryIdentity,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, RepositoryError> {
        self.host
            .list_recent_commits(repo, limit)
            .await
            .map_err(|source| RepositoryError::HostFetch {
                repo: repo.clone(),
                source,
            })
    }

    async fn enrich(
        &self,
        repo: &RepositoryIdentity,
        summary: CommitSummary,
    ) -> Result<CommitRecord, RepositoryError> {
        let diff = self
            .host
            .get_commit_diff(repo, &summary.sha)
            .await
            .map_err(|source| RepositoryError::HostFetch {
                repo: repo.clone(),
                source: source.context(format!("fetching diff for {}", summary.short_sha())),
            })?;

        let pull_request = match self
            .host
            .get_associated_pull_request(repo, &summary.sha)
            .await
        {
            Ok(pr) => pr,
            Err(e) => {
                warn!(
                    repo = %repo,
                    sha = %summary.short_sha(),
                    error = %e,
                    "Pull request lookup failed; classifying without PR context"
                );
                None
            }
        };

        Ok(CommitRecord::enrich(
            summary,
            diff,
            self.max_diff_chars,
            pull_request,
        ))
    }
}

struct Selection {
    commits: Vec<CommitSummary>,
    found_watermark: bool,
    reached_cap: bool,
}

/// The contiguous newest-first prefix of `listed` that is newer than
/// `watermark`, capped at `cap`.
fn select_new(listed: Vec<CommitSummary>, watermark: &str, cap: usize) -> Selection {
    let mut commits = Vec::new();
    for commit in listed {
        if commit.sha == watermark {
            return Selection {
                commits,
                found_watermark: true,
                reached_cap: false,
            };
        }
        if commits.len() == cap {
            return Selection {
                commits,
                found_watermark: false,
                reached_cap: true,
            };
        }
        commits.push(commit);
    }
    Selection {
        commits,
        found_watermark: false,
        reached_cap: false,
    }
}
