//! Watermark persistence.
//!
//! The durable state is a flat JSON object mapping `"owner/name"` to the
//! newest commit id already processed for that repository:
//!
//! ```json
//! {
//!   "acme/api": "4f2a9c0d1e2f3a4b5c6d7e8f9a0b1c2d3e4f5a6b"
//! }
//! ```
//!
//! It is read once when a run starts and written when the run ends (or after
//! every repository in per-repository checkpoint mode). Writes go through a
//! temp file and a rename so a crash never leaves a half-written file.

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use patchwatch_common::RepositoryIdentity;

use crate::errors::RunError;

/// In-memory watermark mapping, owned by the orchestrator for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatermarkState {
    entries: BTreeMap<String, String>,
}

impl WatermarkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, repo: &RepositoryIdentity) -> Option<&str> {
        self.entries.get(&repo.state_key()).map(String::as_str)
    }

    /// Record `sha` as the newest processed commit. Returns the previous value.
    pub fn advance(&mut self, repo: &RepositoryIdentity, sha: &str) -> Option<String> {
        self.entries.insert(repo.state_key(), sha.to_string())
    }

    /// Forget a repository by its `owner/name` key.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Held for the duration of a run; dropping it releases the lock.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
    path: PathBuf,
}

impl StateLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Durable backing store for [`WatermarkState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load watermarks for a run over `configured`.
    ///
    /// Never fails. A missing, unreadable or malformed file yields an empty
    /// mapping. Entries whose key is not an `owner/name` identity, or whose
    /// value does not look like a commit id, are dropped. Entries for
    /// repositories outside `configured` are kept untouched so that a run over
    /// a subset saves them back unchanged.
    pub fn load(&self, configured: &[RepositoryIdentity]) -> WatermarkState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No state file yet; every repository starts fresh");
                return WatermarkState::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read state file; starting with empty state");
                return WatermarkState::new();
            }
        };

        let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&content)
        {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "State file is not a JSON object; starting with empty state");
                return WatermarkState::new();
            }
        };

        let configured: HashSet<String> = configured.iter().map(|r| r.state_key()).collect();
        let mut state = WatermarkState::new();
        let mut carried = 0usize;
        for (key, value) in raw {
            if !is_state_key(&key) {
                warn!(key = %key, "Dropping state entry with an invalid repository key");
                continue;
            }
            match value.as_str() {
                Some(sha) if looks_like_commit_id(sha) => {
                    if !configured.contains(&key) {
                        debug!(key = %key, "Keeping watermark for a repository outside this run");
                        carried += 1;
                    }
                    state.entries.insert(key, sha.to_string());
                }
                _ => {
                    warn!(key = %key, value = %value, "Dropping state entry with a malformed commit id");
                }
            }
        }

        debug!(entries = state.len(), carried, "Loaded watermark state");
        state
    }

    /// Read every entry without validation. A missing file is empty state.
    pub fn load_all(&self) -> Result<WatermarkState> {
        if !self.path.exists() {
            return Ok(WatermarkState::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    /// Write the full mapping atomically.
    pub fn save(&self, state: &WatermarkState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;

        let temp_path = sibling(&self.path, "tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        temp_file
            .write_all(json.as_bytes())
            .and_then(|_| temp_file.write_all(b"\n"))
            .context("Failed to write state")?;
        temp_file.sync_all().context("Failed to sync state")?;

        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = state.len(), "Saved watermark state");
        Ok(())
    }

    /// Take the exclusive run lock (`<state>.lock`) without blocking.
    pub fn lock(&self) -> Result<StateLock, RunError> {
        let lock_path = sibling(&self.path, "lock");
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(StateLock {
                _file: file,
                path: lock_path,
            }),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(RunError::StateLocked {
                    path: self.path.clone(),
                })
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to lock {}", lock_path.display()))
                .into()),
        }
    }
}

/// `state.json` -> `state.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// A key is valid when it is the canonical `owner/name` form of an identity.
fn is_state_key(key: &str) -> bool {
    key.parse::<RepositoryIdentity>()
        .is_ok_and(|repo| repo.state_key() == key)
}

/// Commit ids are hex, 4 to 64 chars (abbreviated SHA-1 up to full SHA-256).
pub fn looks_like_commit_id(value: &str) -> bool {
    (4..=64).contains(&value.len()) && value.chars().all(|c| c.is_ascii_hexdigit())
}
