use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::warn;

use patchwatch_common::RepositoryIdentity;

use crate::errors::ConfigError;
use crate::patchwatch_config::{
    CheckpointMode, LogFormat, PatchwatchToml, config_dir, resolve_path,
};

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub repositories: Vec<String>,
    pub max_commits: Option<usize>,
    pub create_issues: Option<bool>,
    pub model: Option<String>,
}

/// Where positive verdicts are filed.
#[derive(Debug, Clone)]
pub struct IssueSettings {
    pub target: RepositoryIdentity,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub max_diff_chars: usize,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: String,
}

/// Runtime configuration for a monitoring run.
///
/// Bridges `patchwatch.toml` with environment variables and CLI flags, and
/// validates everything a run needs before any repository is touched. Every
/// error from [`Config::resolve`] is fatal.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub repositories: Vec<RepositoryIdentity>,
    pub max_commits: usize,
    /// How many commits to list when searching for the watermark
    pub fetch_window: usize,
    pub state_file: PathBuf,
    pub checkpoint: CheckpointMode,
    /// `None` when issue creation is disabled
    pub issues: Option<IssueSettings>,
    pub classifier: ClassifierSettings,
    pub github: GitHubSettings,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load `.patchwatch/patchwatch.toml` under `project_dir` and resolve it
    /// against the process environment and `overrides`.
    pub fn load(project_dir: &Path, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")
            .map_err(ConfigError::Load)?;
        let toml =
            PatchwatchToml::load_or_default(&config_dir(&project_dir)).map_err(ConfigError::Load)?;
        Self::resolve(&project_dir, &toml, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve a parsed file against an environment lookup and CLI overrides.
    pub fn resolve<F>(
        project_dir: &Path,
        toml: &PatchwatchToml,
        overrides: &CliOverrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_repos = if overrides.repositories.is_empty() {
            &toml.monitor.repositories
        } else {
            &overrides.repositories
        };
        let repositories = parse_repositories(raw_repos)?;

        let max_commits = match overrides.max_commits {
            Some(n) => n,
            None => match env("PATCHWATCH_MAX_COMMITS") {
                Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: "PATCHWATCH_MAX_COMMITS",
                    value: value.clone(),
                    message: "expected a positive integer".to_string(),
                })?,
                None => toml.monitor.max_commits,
            },
        };
        if max_commits == 0 {
            return Err(ConfigError::ZeroMaxCommits);
        }
        let fetch_window = max_commits.max(toml.monitor.page_size);

        let issues_enabled = overrides.create_issues.unwrap_or(toml.issues.enabled);
        let issues = if issues_enabled {
            let target = toml
                .issues
                .target_repository
                .as_deref()
                .ok_or(ConfigError::MissingIssueTarget)?
                .trim()
                .parse::<RepositoryIdentity>()
                .map_err(ConfigError::InvalidTarget)?;
            Some(IssueSettings {
                target,
                labels: toml.issues.labels.clone(),
            })
        } else {
            None
        };

        let token = required_env(&env, &toml.github.token_env, "GitHub API access")?;
        let api_key = required_env(&env, &toml.classifier.api_key_env, "classification endpoint")?;

        let model = overrides
            .model
            .clone()
            .or_else(|| env("PATCHWATCH_MODEL"))
            .unwrap_or_else(|| toml.classifier.model.clone());

        let state_file = resolve_path(project_dir, &toml.monitor.state_file);
        let log_dir = toml
            .logging
            .dir
            .as_ref()
            .map(|dir| resolve_path(project_dir, dir));

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            repositories,
            max_commits,
            fetch_window,
            state_file,
            checkpoint: toml.monitor.checkpoint,
            issues,
            classifier: ClassifierSettings {
                endpoint: toml.classifier.endpoint.clone(),
                model,
                api_key,
                max_diff_chars: toml.classifier.max_diff_chars,
                max_retries: toml.classifier.max_retries,
            },
            github: GitHubSettings {
                api_url: toml.github.api_url.trim_end_matches('/').to_string(),
                token,
            },
            log_format: toml.logging.format,
            log_dir,
        })
    }
}

/// Parse and de-duplicate the repository list, preserving first-seen order.
pub fn parse_repositories(raw: &[String]) -> Result<Vec<RepositoryIdentity>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoRepositories);
    }
    let mut repositories: Vec<RepositoryIdentity> = Vec::with_capacity(raw.len());
    for value in raw {
        let repo =
            RepositoryIdentity::parse_flexible(value).map_err(ConfigError::InvalidRepository)?;
        if repositories.contains(&repo) {
            warn!(repo = %repo, "Repository listed more than once; monitoring it once");
            continue;
        }
        repositories.push(repo);
    }
    Ok(repositories)
}

fn required_env<F>(env: &F, var: &str, purpose: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    env(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingCredential {
            var: var.to_string(),
            purpose,
        })
}
