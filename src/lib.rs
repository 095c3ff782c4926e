pub mod classifier;
pub mod config;
pub mod errors;
pub mod frontier;
pub mod github;
pub mod issues;
pub mod logging;
pub mod orchestrator;
pub mod patchwatch_config;
pub mod state;
pub mod ui;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

// Domain types live in the common crate; re-exported for convenience.
pub use patchwatch_common::{
    ClassificationOracle, CommitRecord, CommitSummary, IssueDraft, OracleError,
    PullRequestContext, RepositoryHost, RepositoryIdentity, Severity, Verdict,
};
