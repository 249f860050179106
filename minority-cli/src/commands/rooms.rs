use super::{pool_label, print_result, status_label};
use clap::Subcommand;
use comfy_table::{presets::UTF8_FULL, Table};
use minority_game::demo::{demo_rooms, find_demo_room};

#[derive(Subcommand)]
pub enum RoomCommands {
    /// List demo rooms
    List,
    /// Show players and result of a room
    Show {
        /// Room ID
        room_id: String,
        /// Print the room as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_room_command(cmd: RoomCommands) -> anyhow::Result<()> {
    match cmd {
        RoomCommands::List => {
            let rooms = demo_rooms()?;

            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec![
                "ID", "Name", "Status", "Bet", "Players", "Prize Pool",
            ]);

            for room in &rooms {
                let info = room.get_info();
                table.add_row(vec![
                    info.id.clone(),
                    info.name.clone(),
                    status_label(info.status).to_string(),
                    info.bet_amount.to_string(),
                    format!("{}/{}", info.current_players, info.max_players),
                    pool_label(info.prize_pool),
                ]);
            }

            println!("{table}");
        }

        RoomCommands::Show { room_id, json } => {
            let room = find_demo_room(&room_id)?;

            if json {
                println!("{}", room.to_json()?);
                return Ok(());
            }

            println!("Room: {} ({})", room.name(), room.id());
            println!("═══════════════════════════════════");
            println!("{}", room.description());
            println!("Status: {}", status_label(room.status()));
            println!("Bet Amount: {}", room.bet_amount());
            println!("Players: {}/{}", room.current_players(), room.max_players());
            println!("Prize Pool: {}", pool_label(room.prize_pool()));
            println!();

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["Address", "Name", "Joined", "Sealed", "Choice", "Payout"]);

            for player in room.players() {
                table.add_row(vec![
                    player.address().to_string(),
                    player.name().to_string(),
                    player.join_time().format("%H:%M:%S").to_string(),
                    if player.has_committed() { "yes" } else { "no" }.to_string(),
                    player
                        .revealed_choice()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    player.payout().to_string(),
                ]);
            }
            println!("{table}");

            if room.result().is_some() {
                println!();
                print_result(&room);
            }
        }
    }

    Ok(())
}
