//! Configuration view and validation commands: `patchwatch config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use patchwatch::config::{CliOverrides, Config};
    use patchwatch::patchwatch_config::{CONFIG_FILE, PatchwatchToml, config_dir};

    let patchwatch_dir = config_dir(project_dir);
    let config_path = patchwatch_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Patchwatch Configuration");
            println!("========================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                PatchwatchToml::load(&config_path)?
            } else {
                println!("No patchwatch.toml found at {}", config_path.display());
                println!("Using default configuration.");
                PatchwatchToml::default()
            };
            println!();

            println!("[monitor]");
            if toml.monitor.repositories.is_empty() {
                println!("  repositories = []");
            } else {
                println!("  repositories = [");
                for repo in &toml.monitor.repositories {
                    println!("    \"{}\",", repo);
                }
                println!("  ]");
            }
            println!("  max_commits = {}", toml.monitor.max_commits);
            println!("  page_size = {}", toml.monitor.page_size);
            println!("  state_file = \"{}\"", toml.monitor.state_file.display());
            println!("  checkpoint = \"{}\"", toml.monitor.checkpoint);
            println!();

            println!("[issues]");
            println!("  enabled = {}", toml.issues.enabled);
            if let Some(target) = &toml.issues.target_repository {
                println!("  target_repository = \"{}\"", target);
            }
            println!("  labels = {:?}", toml.issues.labels);
            println!();

            println!("[classifier]");
            println!("  endpoint = \"{}\"", toml.classifier.endpoint);
            println!("  model = \"{}\"", toml.classifier.model);
            println!("  max_diff_chars = {}", toml.classifier.max_diff_chars);
            println!("  max_retries = {}", toml.classifier.max_retries);
            println!("  api_key_env = \"{}\"", toml.classifier.api_key_env);
            println!();

            println!("[github]");
            println!("  api_url = \"{}\"", toml.github.api_url);
            println!("  token_env = \"{}\"", toml.github.token_env);
            println!();

            // Effective values need credentials; report why when they are missing.
            println!("Effective values (with env/CLI overrides):");
            match Config::load(project_dir, &CliOverrides::default()) {
                Ok(config) => {
                    println!("  repositories = {}", config.repositories.len());
                    println!("  max_commits = {}", config.max_commits);
                    println!("  fetch_window = {}", config.fetch_window);
                    println!("  model = \"{}\"", config.classifier.model);
                    println!("  state_file = \"{}\"", config.state_file.display());
                    match &config.issues {
                        Some(issues) => println!("  issues -> {}", issues.target),
                        None => println!("  issues disabled"),
                    }
                    println!("  log_format = {:?}", config.log_format);
                }
                Err(e) => println!("  unavailable: {}", e),
            }
            println!();

            if !config_path.exists() {
                println!("Run 'patchwatch config init' to create a patchwatch.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No patchwatch.toml found. Using defaults.");
            }

            let toml = PatchwatchToml::load_or_default(&patchwatch_dir)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("patchwatch.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !patchwatch_dir.exists() {
                std::fs::create_dir_all(&patchwatch_dir)?;
            }

            let toml = PatchwatchToml::default();
            toml.save(&config_path)?;

            println!("Created patchwatch.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [monitor] repositories, max_commits, checkpoint");
            println!("  - [issues] enabled, target_repository, labels");
            println!("  - [classifier] endpoint, model, api_key_env");
            println!();
        }
    }

    Ok(())
}
