mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use jotter::config::JotterConfig;

#[derive(Parser)]
#[command(name = "jotter", version, about = "Personal assistant for tasks, notes and everything else")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Talk to the assistant (default)
    Chat,
    /// Print a summary of every collection in the database
    Describe {
        /// Sample items to show per collection
        #[arg(short, long, default_value_t = 3)]
        samples: usize,
    },
    /// Fold properties into documents written before they were searchable
    Migrate {
        /// Also recompute every embedding with the configured provider
        #[arg(long)]
        re_embed: bool,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.jotter/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Chat);

    let config = JotterConfig::load()?;

    if matches!(command, Command::Chat) {
        if let Err(e) = config.validate_llm() {
            eprintln!("Configuration error:\n{e}");
            std::process::exit(1);
        }
    }

    jotter::logging::init(&config.logging)?;
    info!(model = %config.llm.model, "starting");
    info!(app = %config.logging.app_level, deps = %config.logging.deps_level, "log levels");
    info!(
        console = config.logging.to_console,
        file = config.logging.file_path.as_deref().unwrap_or("disabled"),
        "log output"
    );

    match command {
        Command::Chat => cli::chat::run(&config).await?,
        Command::Describe { samples } => cli::describe::run(&config, samples)?,
        Command::Migrate { re_embed } => cli::migrate::run(&config, re_embed).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
