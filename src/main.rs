use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sidechat::config::Config;
use sidechat::{logging, ui};

mod commands;

#[derive(Parser)]
#[command(name = "sidechat")]
#[command(version)]
#[command(about = "Side-panel conversational assistant", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.sidechat/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat panel
    Chat,
    /// Send messages without the UI and print the transcript
    Ask {
        /// Messages to send, one turn each
        #[arg(required = true)]
        messages: Vec<String>,
        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write it to the config file as well
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            logging::init_file(&config)?;
            ui::run(&config).await
        }
        Commands::Ask { messages, json } => {
            logging::init_stderr(&config);
            commands::ask(&config, &messages, json).await
        }
        Commands::Config { init } => {
            logging::init_stderr(&config);
            commands::show_config(&config, init)
        }
    }
}
