//! Shared domain types for patchwatch.
//!
//! This crate carries no HTTP stack. It defines what flows between the
//! frontier tracker, the run orchestrator and the two external capabilities:
//!
//! - [`RepositoryHost`]: listing commits, fetching diffs and pull requests,
//!   creating issues
//! - [`ClassificationOracle`]: mapping a commit to a [`Verdict`]

pub mod commit;
pub mod host;
pub mod identity;
pub mod oracle;
pub mod verdict;

pub use commit::{CommitRecord, CommitSummary, PullRequestContext};
pub use host::{IssueDraft, RepositoryHost};
pub use identity::{IdentityError, RepositoryIdentity};
pub use oracle::{ClassificationOracle, OracleError};
pub use verdict::{Severity, Verdict};
