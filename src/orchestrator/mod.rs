pub mod output;
pub mod runner;

pub use output::{Detection, RepositoryOutcome, RepositoryReport, RunOutput};
pub use runner::{RunOrchestrator, RunSettings};
