//! Watermark inspection and reset: `patchwatch state`.

use anyhow::Result;
use std::path::Path;

use patchwatch::RepositoryIdentity;
use patchwatch::patchwatch_config::{PatchwatchToml, config_dir, resolve_path};
use patchwatch::state::{StateStore, WatermarkState};
use patchwatch::ui;

fn state_store(project_dir: &Path) -> Result<(StateStore, PatchwatchToml)> {
    let toml = PatchwatchToml::load_or_default(&config_dir(project_dir))?;
    let path = resolve_path(project_dir, &toml.monitor.state_file);
    Ok((StateStore::new(path), toml))
}

pub fn cmd_state_show(project_dir: &Path) -> Result<()> {
    let (store, toml) = state_store(project_dir)?;
    let state = store.load_all()?;

    println!();
    println!("State file: {}", store.path().display());
    println!();
    ui::print_watermarks(&state);

    let configured: Vec<String> = toml
        .monitor
        .repositories
        .iter()
        .filter_map(|r| RepositoryIdentity::parse_flexible(r).ok())
        .map(|r| r.state_key())
        .collect();
    let stale: Vec<&str> = state
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !configured.iter().any(|c| c == key))
        .collect();
    if !configured.is_empty() && !stale.is_empty() {
        println!();
        println!(
            "Not in [monitor].repositories, kept but not processed: {}",
            stale.join(", ")
        );
    }
    println!();
    Ok(())
}

pub fn cmd_state_reset(project_dir: &Path, repo: Option<&str>, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    let (store, _) = state_store(project_dir)?;
    let _lock = store.lock()?;

    let (state, prompt) = match repo {
        Some(raw) => {
            let key = RepositoryIdentity::parse_flexible(raw)?.state_key();
            let mut state = store.load_all()?;
            if state.remove(&key).is_none() {
                println!("No watermark recorded for {}", key);
                return Ok(());
            }
            let prompt = format!(
                "Reset {}? Its next run records the current head and skips older commits.",
                key
            );
            (state, prompt)
        }
        None => (
            WatermarkState::new(),
            "This will reset every watermark. Are you sure?".to_string(),
        ),
    };

    if !force {
        let confirm = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    store.save(&state)?;
    println!("Reset complete");
    Ok(())
}
