pub mod game;
pub mod rooms;
pub mod seal;

pub use game::{play_round, reveal_demo_room};
pub use rooms::{handle_room_command, RoomCommands};
pub use seal::{handle_seal_command, SealCommands};

use crate::config::CliConfig;
use minority_game::{Amount, Outcome, Room, RoomStatus};

pub fn status_label(status: RoomStatus) -> &'static str {
    match status {
        RoomStatus::Waiting => "waiting",
        RoomStatus::Full => "full",
        RoomStatus::Revealed => "revealed",
    }
}

pub fn pool_label(pool: Option<Amount>) -> String {
    pool.map(|p| p.to_string())
        .unwrap_or_else(|| "overflow".to_string())
}

pub fn print_result(room: &Room) {
    let Some(result) = room.result() else {
        println!("Room {} has not been revealed yet", room.id());
        return;
    };

    println!("------ ROOM REVEALED ------");
    println!("═══════════════════════════════════");
    println!("A: {}  B: {}", result.total_a, result.total_b);

    match result.outcome {
        Outcome::Minority(choice) => {
            println!("Minority side {} wins!", choice);
            println!("Winners: {}", result.winners.len());
            for winner in &result.winners {
                let name = room.player(winner).map(|p| p.name()).unwrap_or("?");
                println!("  {} ({})", name, winner);
            }
            println!("Prize per winner: {}", result.prize_per_winner);
            if result.remainder.to_mist() > 0 {
                println!("Undistributed remainder: {}", result.remainder);
            }
        }
        Outcome::Refund(reason) => {
            println!("No minority ({:?}), every bet is refunded", reason);
        }
    }

    let unopened = room
        .players()
        .iter()
        .filter(|p| p.has_committed() && !p.has_revealed())
        .count();
    if unopened > 0 {
        println!("{} sealed choice(s) could not be opened and were refunded", unopened);
    }
}

pub fn show_config(config: &CliConfig) -> anyhow::Result<()> {
    println!("Config file: {}", config.config_path().display());
    println!("RPC endpoint: {}", config.seal.rpc_url());
    println!("{}", serde_json::to_string_pretty(&config.seal)?);
    Ok(())
}
