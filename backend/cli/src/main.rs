mod chat_cmd;
mod config_cmd;
mod repl;
mod terminal_output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use solarops_config::{config_dir, config_file_path, AssistantConfig};
use solarops_core::SiteId;

use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "solarops-chat")]
#[command(about = "Chat with the SolarOps site assistant")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.solarops/assistant.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an interactive chat for a site
    Chat {
        /// Site identifier
        #[arg(short, long)]
        site: u64,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

/// Relative log directories live next to the config file.
fn log_dir(config: &AssistantConfig, config_path: &Path) -> PathBuf {
    let dir = PathBuf::from(config.logging().dir());
    if dir.is_absolute() {
        return dir;
    }
    config_path
        .parent()
        .map(|parent| parent.join(&dir))
        .unwrap_or(dir)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Chat { site } => {
            let config = match solarops_config::load_and_prepare(&config_path).await {
                Ok(config) => config,
                Err(e) => {
                    note_error(&format!("{e:#}"));
                    std::process::exit(2);
                }
            };
            let logging = config.logging();
            solarops_logging::init_logger(
                log_dir(&config, &config_path),
                logging.level(),
                logging.json(),
            );
            chat_cmd::run(config, SiteId(site)).await?;
        }
        Commands::Config => config_cmd::run(&config_path).await?,
    }

    Ok(())
}
