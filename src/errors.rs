//! Typed error hierarchy for patchwatch.
//!
//! Errors are split by the granularity at which they stop work:
//! - `ConfigError` and `RunError`: fatal, raised before any repository is processed
//! - `RepositoryError`: stops one repository for this run; the run continues
//!
//! Commit-level failures (`OracleError`) and issue-creation failures never
//! surface past the orchestrator; they are logged and recorded in the run output.

use patchwatch_common::{IdentityError, RepositoryIdentity};
use thiserror::Error;

/// Invalid configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No repositories configured. Add [monitor].repositories to patchwatch.toml or pass --repo")]
    NoRepositories,

    #[error("Invalid repository in configuration: {0}")]
    InvalidRepository(#[source] IdentityError),

    #[error("Invalid issue target repository: {0}")]
    InvalidTarget(#[source] IdentityError),

    #[error("Issue creation is enabled but [issues].target_repository is not set")]
    MissingIssueTarget,

    #[error("max_commits must be at least 1")]
    ZeroMaxCommits,

    #[error("Environment variable {var} is not set ({purpose})")]
    MissingCredential { var: String, purpose: &'static str },

    #[error("Invalid value '{value}' for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("Failed to load configuration: {0}")]
    Load(#[source] anyhow::Error),
}

/// Failure processing a single repository. The run moves on to the next one.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Failed to fetch from {repo}: {source:#}")]
    HostFetch {
        repo: RepositoryIdentity,
        #[source]
        source: anyhow::Error,
    },

    #[error("Repository {repo} has no commits")]
    NoCommitsFound { repo: RepositoryIdentity },
}

/// Fatal errors that abort a run before processing begins.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("State file {path} is locked by another patchwatch run")]
    StateLocked { path: std::path::PathBuf },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
