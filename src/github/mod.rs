//! GitHub implementation of the [`RepositoryHost`](patchwatch_common::RepositoryHost)
//! capability.
//!
//! | Operation                     | Endpoint                                   |
//! |-------------------------------|--------------------------------------------|
//! | `list_recent_commits`         | `GET /repos/{o}/{r}/commits` (paged)       |
//! | `get_commit_diff`             | `GET /repos/{o}/{r}/commits/{sha}` (diff)  |
//! | `get_associated_pull_request` | `GET /repos/{o}/{r}/commits/{sha}/pulls`   |
//! | `create_issue`                | `POST /repos/{o}/{r}/issues`               |

pub mod client;
pub mod models;

pub use client::GitHubClient;
pub use models::is_valid_github_token;
