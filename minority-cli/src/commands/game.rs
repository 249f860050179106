use super::{pool_label, print_result};
use anyhow::{bail, Context};
use minority_game::demo::{find_demo_room, random_choices, seal_choices};
use minority_game::{open_room_session, Amount, Room, RoomStatus};
use minority_seal::{Choice, SealService};
use std::sync::Arc;

const YOUR_ADDRESS: &str = "0xyou";

/// Parse a compact choice list such as `AAB B,A`.
pub fn parse_choices(raw: &str) -> anyhow::Result<Vec<Choice>> {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| c.to_string().parse::<Choice>().map_err(Into::into))
        .collect()
}

pub async fn reveal_demo_room(
    service: Arc<SealService>,
    room_id: &str,
    choices: Option<&str>,
) -> anyhow::Result<()> {
    let mut room = find_demo_room(room_id)?;

    if room.status() == RoomStatus::Revealed {
        println!("Room {} was already revealed.", room.id());
        println!();
        print_result(&room);
        return Ok(());
    }

    let choices = match choices {
        Some(raw) => parse_choices(raw)?,
        None => random_choices(room.current_players()),
    };

    let session = open_room_session(service, &room).await?;
    seal_choices(&mut room, &session, &choices).await?;

    println!("Sealed choices for room {}:", room.id());
    for player in room.players() {
        let info = session.get_encrypted_data_info(player.encrypted_choice().unwrap_or_default());
        println!("  {:<8} {}", player.name(), info.preview);
    }
    println!();

    room.reveal(&session).await?;
    session.close();

    print_result(&room);
    Ok(())
}

pub async fn play_round(
    service: Arc<SealService>,
    players: usize,
    bet: &str,
    choice: Option<Choice>,
) -> anyhow::Result<()> {
    if players < 2 {
        bail!("A round needs at least 2 players");
    }

    let bet: Amount = bet.parse()?;
    let choice = match choice {
        Some(choice) => choice,
        None => prompt_choice()?,
    };

    let mut room = Room::new("Practice room", bet, players)?;
    room.join(YOUR_ADDRESS, "You")?;
    for i in 1..players {
        room.join(format!("0x{:x}", i), format!("Bot {}", i))?;
    }

    let session = open_room_session(service, &room).await?;

    room.seal_choice(&session, YOUR_ADDRESS, choice).await?;
    let bots: Vec<String> = room
        .players()
        .iter()
        .filter(|p| p.address() != YOUR_ADDRESS)
        .map(|p| p.address().to_string())
        .collect();
    for bot in &bots {
        room.seal_choice(&session, bot, Choice::random()).await?;
    }

    println!("You sealed {} in room {}", choice, room.id());
    println!("Prize pool: {}", pool_label(room.prize_pool()));
    println!();

    room.reveal(&session).await?;
    session.close();

    print_result(&room);

    let you = room
        .player(YOUR_ADDRESS)
        .context("player missing after reveal")?;
    println!();
    if you.is_winner() {
        println!("You were in the minority and won {}!", you.payout());
    } else if you.payout() > Amount::ZERO {
        println!("No minority this round, your {} was refunded.", you.payout());
    } else {
        println!("You were in the majority. Better luck next time.");
    }

    Ok(())
}

fn prompt_choice() -> anyhow::Result<Choice> {
    let options = ["A", "B"];
    let selection = dialoguer::Select::new()
        .with_prompt("Pick a side (the smaller group wins)")
        .items(&options)
        .default(0)
        .interact()?;
    Ok(Choice::ALL[selection])
}
