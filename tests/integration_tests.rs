//! Integration tests for the patchwatch binary.
//!
//! These never reach the network: every `run` here is expected to stop at a
//! fatal configuration or locking error before any client is used.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A patchwatch command with the credential and override variables cleared.
fn patchwatch(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("patchwatch");
    cmd.current_dir(dir.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("PATCHWATCH_LLM_API_KEY")
        .env_remove("PATCHWATCH_MAX_COMMITS")
        .env_remove("PATCHWATCH_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn with_credentials(mut cmd: Command) -> Command {
    cmd.env("GITHUB_TOKEN", "ghp_integrationtest")
        .env("PATCHWATCH_LLM_API_KEY", "sk-integrationtest");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write_config(dir: &TempDir, content: &str) {
    let config_dir = dir.path().join(".patchwatch");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("patchwatch.toml"), content).unwrap();
}

fn write_state(dir: &TempDir, content: &str) {
    let config_dir = dir.path().join(".patchwatch");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("state.json"), content).unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("state"));
    }

    #[test]
    fn test_version() {
        let dir = create_temp_project();
        patchwatch(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_run_help_lists_overrides() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--max-commits"))
            .stdout(predicate::str::contains("--no-issues"))
            .stdout(predicate::str::contains("--dry-run"));
    }

    #[test]
    fn test_issue_flags_conflict() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .args(["run", "--repo", "a/b", "--create-issues", "--no-issues"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Fatal configuration errors
// =============================================================================

mod fatal_config {
    use super::*;

    #[test]
    fn test_run_without_repositories_fails() {
        let dir = create_temp_project();
        with_credentials(patchwatch(&dir))
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No repositories configured"));
    }

    #[test]
    fn test_run_with_invalid_repository_fails() {
        let dir = create_temp_project();
        with_credentials(patchwatch(&dir))
            .args(["run", "--repo", "not-a-repo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid repository"));
    }

    #[test]
    fn test_run_without_token_fails() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .env("PATCHWATCH_LLM_API_KEY", "sk-x")
            .args(["run", "--repo", "acme/api"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_run_without_llm_key_fails() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .env("GITHUB_TOKEN", "ghp_x")
            .args(["run", "--repo", "acme/api"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("PATCHWATCH_LLM_API_KEY"));
    }

    #[test]
    fn test_zero_max_commits_fails() {
        let dir = create_temp_project();
        with_credentials(patchwatch(&dir))
            .args(["run", "--repo", "acme/api", "--max-commits", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("max_commits must be at least 1"));
    }

    #[test]
    fn test_issues_without_target_fails() {
        let dir = create_temp_project();
        with_credentials(patchwatch(&dir))
            .args(["run", "--repo", "acme/api", "--create-issues"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("target_repository"));
    }

    #[test]
    fn test_malformed_config_file_fails() {
        let dir = create_temp_project();
        write_config(&dir, "[monitor\nrepositories = ");
        with_credentials(patchwatch(&dir))
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("patchwatch.toml"));
    }

    #[test]
    fn test_locked_state_fails_before_processing() {
        use patchwatch::state::StateStore;

        let dir = create_temp_project();
        write_config(&dir, "[monitor]\nrepositories = [\"acme/api\"]\n");
        let store = StateStore::new(dir.path().join(".patchwatch/state.json"));
        let _held = store.lock().unwrap();

        with_credentials(patchwatch(&dir))
            .arg("run")
            .assert()
            .failure()
            .stderr(predicate::str::contains("locked by another patchwatch run"));
    }
}

// =============================================================================
// Config Command Tests
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_config_init_creates_file() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created patchwatch.toml"));

        let content = fs::read_to_string(dir.path().join(".patchwatch/patchwatch.toml")).unwrap();
        assert!(content.contains("[monitor]"));
        assert!(content.contains("max_commits = 50"));
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = create_temp_project();
        write_config(&dir, "[monitor]\nrepositories = [\"acme/api\"]\n");
        patchwatch(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        let content = fs::read_to_string(dir.path().join(".patchwatch/patchwatch.toml")).unwrap();
        assert!(content.contains("acme/api"));
    }

    #[test]
    fn test_config_show_reads_dotenv() {
        let dir = create_temp_project();
        write_config(&dir, "[monitor]\nrepositories = [\"acme/api\"]\n");
        fs::write(
            dir.path().join(".env"),
            "GITHUB_TOKEN=ghp_fromdotenv\nPATCHWATCH_LLM_API_KEY=sk-fromdotenv\nPATCHWATCH_MODEL=model-from-dotenv\n",
        )
        .unwrap();
        patchwatch(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("model = \"model-from-dotenv\""))
            .stdout(predicate::str::contains("unavailable").not());
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        write_config(
            &dir,
            "[monitor]\nrepositories = [\"acme/api\", \"broken\"]\n\n[issues]\nenabled = true\n",
        );
        patchwatch(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("monitor.repositories"))
            .stdout(predicate::str::contains("issues.target_repository"));
    }

    #[test]
    fn test_config_validate_clean_file() {
        let dir = create_temp_project();
        write_config(&dir, "[monitor]\nrepositories = [\"acme/api\"]\n");
        patchwatch(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using default configuration."))
            .stdout(predicate::str::contains("model = \"gpt-4o-mini\""))
            .stdout(predicate::str::contains("unavailable"));
    }
}

// =============================================================================
// State Command Tests
// =============================================================================

mod state_command {
    use super::*;

    #[test]
    fn test_state_show_empty() {
        let dir = create_temp_project();
        patchwatch(&dir)
            .args(["state", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No watermarks recorded yet."));
    }

    #[test]
    fn test_state_show_lists_entries() {
        let dir = create_temp_project();
        write_config(&dir, "[monitor]\nrepositories = [\"acme/api\"]\n");
        write_state(&dir, r#"{"acme/api": "abc1234", "old/repo": "def5678"}"#);
        patchwatch(&dir)
            .args(["state", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("acme/api"))
            .stdout(predicate::str::contains("abc1234"))
            .stdout(predicate::str::contains("kept but not processed: old/repo"));
    }

    #[test]
    fn test_state_reset_single_repository() {
        let dir = create_temp_project();
        write_state(&dir, r#"{"acme/api": "abc1234", "acme/web": "def5678"}"#);
        patchwatch(&dir)
            .args(["state", "reset", "acme/api", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Reset complete"));

        let content = fs::read_to_string(dir.path().join(".patchwatch/state.json")).unwrap();
        assert!(!content.contains("acme/api"));
        assert!(content.contains("acme/web"));
    }

    #[test]
    fn test_state_reset_accepts_url() {
        let dir = create_temp_project();
        write_state(&dir, r#"{"acme/api": "abc1234"}"#);
        patchwatch(&dir)
            .args(["state", "reset", "https://github.com/acme/api.git", "--force"])
            .assert()
            .success();

        let content = fs::read_to_string(dir.path().join(".patchwatch/state.json")).unwrap();
        assert!(!content.contains("acme/api"));
    }

    #[test]
    fn test_state_reset_unknown_repository() {
        let dir = create_temp_project();
        write_state(&dir, r#"{"acme/api": "abc1234"}"#);
        patchwatch(&dir)
            .args(["state", "reset", "acme/other", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No watermark recorded for acme/other"));
    }

    #[test]
    fn test_state_reset_all() {
        let dir = create_temp_project();
        write_state(&dir, r#"{"acme/api": "abc1234", "acme/web": "def5678"}"#);
        patchwatch(&dir)
            .args(["state", "reset", "--force"])
            .assert()
            .success();

        let content = fs::read_to_string(dir.path().join(".patchwatch/state.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }
}
