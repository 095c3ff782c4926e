//! Classification oracle capability.

use async_trait::async_trait;
use thiserror::Error;

use crate::commit::CommitRecord;
use crate::verdict::Verdict;

/// Failures reaching the oracle.
///
/// A response that arrives but cannot be parsed is not one of these: the
/// oracle folds it into a negative verdict itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("classification request failed: {message}")]
    Transport { message: String },

    #[error("classification endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("classification endpoint still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("classification endpoint returned no completion")]
    EmptyResponse,
}

/// Stateless `commit -> verdict` function backed by an external model.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify(&self, commit: &CommitRecord) -> Result<Verdict, OracleError>;
}
