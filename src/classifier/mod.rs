//! LLM-backed classification oracle.
//!
//! - `prompt`: builds the request with untrusted content fenced off
//! - `parse`: turns model output into a normalized [`Verdict`](patchwatch_common::Verdict)
//! - `client`: HTTP transport with rate-limit aware retries

pub mod client;
pub mod parse;
pub mod prompt;

pub use client::LlmClassifier;
pub use parse::parse_verdict;
