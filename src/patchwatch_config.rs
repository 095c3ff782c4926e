//! Configuration file format for patchwatch.
//!
//! Settings are read from `.patchwatch/patchwatch.toml`. Every section and
//! field has a default, so an empty file is valid (though a run still needs
//! at least one repository, supplied here or with `--repo`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [monitor]
//! repositories = ["rust-lang/cargo", "https://github.com/tokio-rs/tokio"]
//! max_commits = 50
//! page_size = 100
//! state_file = ".patchwatch/state.json"
//! checkpoint = "end-of-run"
//!
//! [issues]
//! enabled = true
//! target_repository = "acme/security-triage"
//! labels = ["security", "patchwatch"]
//!
//! [classifier]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! model = "gpt-4o-mini"
//! max_diff_chars = 40000
//! max_retries = 3
//! api_key_env = "PATCHWATCH_LLM_API_KEY"
//!
//! [github]
//! api_url = "https://api.github.com"
//! token_env = "GITHUB_TOKEN"
//!
//! [logging]
//! format = "text"
//! dir = ".patchwatch/logs"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use patchwatch_common::RepositoryIdentity;

/// When watermark state is written back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckpointMode {
    /// Write the full mapping once, after every repository has been processed.
    #[default]
    EndOfRun,
    /// Also write after each repository whose watermark moved.
    PerRepository,
}

impl std::fmt::Display for CheckpointMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointMode::EndOfRun => write!(f, "end-of-run"),
            CheckpointMode::PerRepository => write!(f, "per-repository"),
        }
    }
}

impl std::str::FromStr for CheckpointMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "end-of-run" => Ok(CheckpointMode::EndOfRun),
            "per-repository" => Ok(CheckpointMode::PerRepository),
            _ => anyhow::bail!(
                "Invalid checkpoint mode '{}'. Valid values: end-of-run, per-repository",
                s
            ),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[monitor]`: which repositories to watch and how much to take per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSection {
    /// Repositories as `owner/name` or GitHub URLs
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Maximum commits classified per repository per run
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    /// Number of commits listed when searching for the watermark
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Watermark state file, relative to the project directory
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default)]
    pub checkpoint: CheckpointMode,
}

fn default_max_commits() -> usize {
    50
}

fn default_page_size() -> usize {
    100
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".patchwatch/state.json")
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            max_commits: default_max_commits(),
            page_size: default_page_size(),
            state_file: default_state_file(),
            checkpoint: CheckpointMode::default(),
        }
    }
}

/// `[issues]`: tracking issues for positive verdicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesSection {
    #[serde(default)]
    pub enabled: bool,
    /// Repository that receives the issues (`owner/name`)
    #[serde(default)]
    pub target_repository: Option<String>,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

fn default_labels() -> Vec<String> {
    vec!["security".to_string(), "patchwatch".to_string()]
}

impl Default for IssuesSection {
    fn default() -> Self {
        Self {
            enabled: false,
            target_repository: None,
            labels: default_labels(),
        }
    }
}

/// `[classifier]`: the completion endpoint used as the classification oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Diffs longer than this are truncated before classification
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,
    /// Retries on rate limiting and server errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_diff_chars() -> usize {
    40_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_api_key_env() -> String {
    "PATCHWATCH_LLM_API_KEY".to_string()
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_diff_chars: default_max_diff_chars(),
            max_retries: default_max_retries(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// `[github]`: host API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for daily-rolling log files (stderr only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// The complete patchwatch.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchwatchToml {
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub issues: IssuesSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl PatchwatchToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse patchwatch.toml")
    }

    /// Load `patchwatch.toml` from the given directory, or defaults if absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize patchwatch.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return a list of warnings.
    ///
    /// Unlike `Config::resolve`, this never fails; it reports everything that
    /// would make a run abort or behave unexpectedly.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.monitor.repositories.is_empty() {
            warnings.push("monitor.repositories is empty; runs need --repo".to_string());
        }
        for repo in &self.monitor.repositories {
            if let Err(e) = RepositoryIdentity::parse_flexible(repo) {
                warnings.push(format!("monitor.repositories: {}", e));
            }
        }
        if self.monitor.max_commits == 0 {
            warnings.push("monitor.max_commits must be at least 1".to_string());
        }
        if self.monitor.page_size == 0 {
            warnings.push("monitor.page_size of 0 is treated as max_commits".to_string());
        }

        if self.issues.enabled {
            match &self.issues.target_repository {
                None => warnings.push(
                    "issues.enabled is true but issues.target_repository is not set".to_string(),
                ),
                Some(target) => {
                    if let Err(e) = target.parse::<RepositoryIdentity>() {
                        warnings.push(format!("issues.target_repository: {}", e));
                    }
                }
            }
        }

        if self.classifier.max_diff_chars < 1_000 {
            warnings.push(format!(
                "classifier.max_diff_chars = {} is very small; most diffs will be truncated",
                self.classifier.max_diff_chars
            ));
        }
        if !self.classifier.endpoint.starts_with("https://")
            && !self.classifier.endpoint.starts_with("http://")
        {
            warnings.push(format!(
                "classifier.endpoint '{}' is not an http(s) URL",
                self.classifier.endpoint
            ));
        }

        warnings
    }
}

/// Name of the patchwatch configuration directory.
pub const CONFIG_DIR: &str = ".patchwatch";

/// Name of the configuration file inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "patchwatch.toml";

/// `.patchwatch/` under the project directory.
pub fn config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR)
}

/// Resolve a configured path against the project directory.
pub fn resolve_path(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
