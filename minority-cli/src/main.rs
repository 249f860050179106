mod commands;
mod config;

use clap::{Parser, Subcommand};
use minority_game::GameError;
use minority_seal::{SealError, SealService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minority")]
#[command(about = "Minority-wins game with sealed A/B choices")]
#[command(version)]
struct Cli {
    /// Data directory for config
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse demo rooms
    #[command(subcommand)]
    Rooms(commands::RoomCommands),

    /// Reveal a full demo room with freshly sealed choices
    Reveal {
        /// Room ID (e.g. demo-3)
        room_id: String,
        /// Choices to seal, one letter per player (e.g. AABAB...). Random if omitted
        #[arg(short, long)]
        choices: Option<String>,
    },

    /// Play a simulated round against bots
    Play {
        /// Number of players including you
        #[arg(short, long)]
        players: Option<usize>,
        /// Bet per player in SUI
        #[arg(short, long, default_value = "0.1")]
        bet: String,
        /// Your choice (A or B). Prompted if omitted
        #[arg(short, long)]
        choice: Option<minority_seal::Choice>,
    },

    /// Session key and sealed choice operations
    #[command(subcommand)]
    Seal(commands::SealCommands),

    /// Show the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "minority={0},minority_seal={0},minority_game={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);
    let config = config::CliConfig::load(&data_dir, cli.verbose).await?;
    tracing::debug!("Using data directory {}", data_dir.display());
    let service = Arc::new(SealService::new(config.seal.clone())?);

    // Execute command
    let result = match cli.command {
        Commands::Rooms(cmd) => commands::handle_room_command(cmd).await,
        Commands::Reveal { room_id, choices } => {
            commands::reveal_demo_room(service, &room_id, choices.as_deref()).await
        }
        Commands::Play {
            players,
            bet,
            choice,
        } => {
            let players = players.unwrap_or(config.seal.default_capacity);
            commands::play_round(service, players, &bet, choice).await
        }
        Commands::Seal(cmd) => commands::handle_seal_command(cmd, &service).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        match e.downcast_ref::<GameError>() {
            Some(GameError::RoomNotFound(id)) => {
                eprintln!("Error: Room '{}' not found", id);
                eprintln!("Use 'minority rooms list' to see available rooms");
            }
            Some(GameError::RoomNotReady(reason)) => {
                eprintln!("Error: Room is not ready to reveal ({})", reason);
            }
            Some(GameError::Seal(SealError::Decryption(reason))) => {
                eprintln!("Error: Could not open sealed choice: {}", reason);
            }
            _ => match e.downcast_ref::<SealError>() {
                Some(SealError::Decryption(reason)) => {
                    eprintln!("Error: Could not open sealed choice: {}", reason);
                    eprintln!("Check that the session key is the one the choice was sealed with");
                }
                _ => eprintln!("Error: {:#}", e),
            },
        }
        std::process::exit(1);
    }

    Ok(())
}
