use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, warn};

use patchwatch::logging;
use patchwatch::patchwatch_config::{LogFormat, PatchwatchToml, config_dir, resolve_path};

mod cmd;

#[derive(Parser)]
#[command(name = "patchwatch")]
#[command(version, about = "Watch repositories for silent security fixes")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log format on stderr. Overrides [logging].format.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify new commits in every monitored repository
    Run {
        /// Repository to monitor (owner/name or GitHub URL). Repeatable; replaces the configured list.
        #[arg(long = "repo", value_name = "OWNER/NAME")]
        repos: Vec<String>,

        /// Maximum commits classified per repository
        #[arg(long)]
        max_commits: Option<usize>,

        /// Create tracking issues for detections
        #[arg(long, conflicts_with = "no_issues")]
        create_issues: bool,

        /// Do not create tracking issues, even if enabled in patchwatch.toml
        #[arg(long)]
        no_issues: bool,

        /// Classification model identifier
        #[arg(long)]
        model: Option<String>,

        /// Classify without creating issues or saving state
        #[arg(long)]
        dry_run: bool,

        /// Also write the run output as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the run output as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Inspect or reset stored watermarks
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum StateCommands {
    /// List the recorded watermark of every repository
    Show,
    /// Forget watermarks so repositories start fresh on the next run
    Reset {
        /// Repository to reset (all when omitted)
        repo: Option<String>,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default patchwatch.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let env_path = project_dir.join(".env");
    let dotenv = dotenvy::from_path(&env_path);

    // A broken config file is reported by the command itself; logging falls
    // back to defaults so that report is visible.
    let logging_section = PatchwatchToml::load_or_default(&config_dir(&project_dir))
        .map(|toml| toml.logging)
        .unwrap_or_default();
    let format = cli.log_format.unwrap_or(logging_section.format);
    let log_dir = logging_section
        .dir
        .as_deref()
        .map(|dir| resolve_path(&project_dir, dir));
    let _log_guard = logging::init(cli.verbose, format, log_dir.as_deref())?;

    match dotenv {
        Ok(()) => debug!(path = %env_path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }

    match &cli.command {
        Commands::Run {
            repos,
            max_commits,
            create_issues,
            no_issues,
            model,
            dry_run,
            output,
            json,
        } => {
            let args = cmd::RunArgs {
                repos: repos.clone(),
                max_commits: *max_commits,
                create_issues: match (*create_issues, *no_issues) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                model: model.clone(),
                dry_run: *dry_run,
                output: output.clone(),
                json: *json,
            };
            cmd::cmd_run(&project_dir, &args).await?;
        }
        Commands::State { command } => match command {
            StateCommands::Show => cmd::cmd_state_show(&project_dir)?,
            StateCommands::Reset { repo, force } => {
                cmd::cmd_state_reset(&project_dir, repo.as_deref(), *force)?
            }
        },
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
