//! Scripted rooms for walkthroughs.
//!
//! `demo-1` is already revealed, `demo-2` is still filling up and `demo-3`
//! is full and ready to reveal once its placeholder ciphertexts are
//! replaced through [`seal_choices`].

use crate::{Amount, GameError, Player, Result, Room, RoomStatus};
use chrono::{Duration, Utc};
use minority_seal::{BatchDecryption, Choice, DecryptedChoice, SealSession};
use rand::Rng;

pub const DEMO_CAPACITY: usize = 9;

struct Seat {
    address: &'static str,
    name: &'static str,
    sealed: &'static str,
    choice: Option<Choice>,
}

const fn seat(
    address: &'static str,
    name: &'static str,
    sealed: &'static str,
    choice: Option<Choice>,
) -> Seat {
    Seat {
        address,
        name,
        sealed,
        choice,
    }
}

const REVEALED_SEATS: [Seat; 9] = [
    seat("0x1", "Alice", "encrypted_A1", Some(Choice::A)),
    seat("0x2", "Bob", "encrypted_B1", Some(Choice::B)),
    seat("0x3", "Charlie", "encrypted_A2", Some(Choice::A)),
    seat("0x4", "Diana", "encrypted_B2", Some(Choice::B)),
    seat("0x5", "Eve", "encrypted_A3", Some(Choice::A)),
    seat("0x6", "Frank", "encrypted_B3", Some(Choice::B)),
    seat("0x7", "Grace", "encrypted_A4", Some(Choice::A)),
    seat("0x8", "Henry", "encrypted_B4", Some(Choice::B)),
    seat("0x9", "Iris", "encrypted_A5", Some(Choice::A)),
];

const WAITING_SEATS: [Seat; 6] = [
    seat("0xa", "Jack", "encrypted_X1", None),
    seat("0xb", "Kate", "encrypted_X2", None),
    seat("0xc", "Leo", "encrypted_X3", None),
    seat("0xd", "Mia", "encrypted_X4", None),
    seat("0xe", "Noah", "encrypted_X5", None),
    seat("0xf", "Olivia", "encrypted_X6", None),
];

const FULL_SEATS: [Seat; 9] = [
    seat("0x10", "Peter", "encrypted_Y1", None),
    seat("0x11", "Quinn", "encrypted_Y2", None),
    seat("0x12", "Ruby", "encrypted_Y3", None),
    seat("0x13", "Sam", "encrypted_Y4", None),
    seat("0x14", "Tina", "encrypted_Y5", None),
    seat("0x15", "Uma", "encrypted_Y6", None),
    seat("0x16", "Victor", "encrypted_Y7", None),
    seat("0x17", "Wendy", "encrypted_Y8", None),
    seat("0x18", "Xavier", "encrypted_Y9", None),
];

fn build(
    id: &str,
    name: &str,
    description: &str,
    bet: &str,
    seats: &[Seat],
    first_join_ms_ago: i64,
    step_ms: i64,
) -> Result<Room> {
    let bet: Amount = bet.parse()?;
    let mut room = Room::with_id(id, name, bet, DEMO_CAPACITY)?
        .with_description(description)
        .mark_demo();

    let now = Utc::now();
    for (i, s) in seats.iter().enumerate() {
        let joined = now - Duration::milliseconds(first_join_ms_ago - step_ms * i as i64);
        room.seat(Player::joined_at(s.address, s.name, joined))?;
    }

    for (player, s) in room.players_mut().iter_mut().zip(seats) {
        player.submit_choice(s.sealed.to_string())?;
    }

    let revealed: Vec<DecryptedChoice> = seats
        .iter()
        .filter_map(|s| {
            s.choice.map(|choice| DecryptedChoice {
                player: s.address.to_string(),
                choice,
            })
        })
        .collect();

    if !revealed.is_empty() {
        room.record_reveal(BatchDecryption {
            revealed,
            failures: Vec::new(),
        })?;
    }

    Ok(room)
}

/// The three demo rooms, freshly built.
pub fn demo_rooms() -> Result<Vec<Room>> {
    Ok(vec![
        build(
            "demo-1",
            "Beginner room",
            "A finished game showing the whole flow and its result",
            "0.1",
            &REVEALED_SEATS,
            3_600_000,
            100_000,
        )?,
        build(
            "demo-2",
            "Open room",
            "Waiting for players to join; shows the sealed choice step",
            "1",
            &WAITING_SEATS,
            1_800_000,
            100_000,
        )?,
        build(
            "demo-3",
            "High roller room",
            "Full room, ready to run the reveal",
            "10",
            &FULL_SEATS,
            900_000,
            50_000,
        )?,
    ])
}

pub fn find_demo_room(id: &str) -> Result<Room> {
    demo_rooms()?
        .into_iter()
        .find(|r| r.id() == id)
        .ok_or_else(|| GameError::RoomNotFound(id.to_string()))
}

/// Replace every seat's sealed choice with a real one sealed by `session`.
pub async fn seal_choices(room: &mut Room, session: &SealSession, choices: &[Choice]) -> Result<()> {
    if room.status() == RoomStatus::Revealed {
        return Err(GameError::InvalidState(
            "Room has already been revealed".to_string(),
        ));
    }
    room.check_session(session)?;

    if choices.len() != room.current_players() {
        return Err(GameError::InvalidState(format!(
            "Got {} choices for {} players",
            choices.len(),
            room.current_players()
        )));
    }

    for (player, choice) in room.players_mut().iter_mut().zip(choices) {
        let sealed = session.encrypt_choice(*choice).await?;
        player.replace_choice(sealed);
    }

    tracing::info!("Sealed {} demo choices in room {}", choices.len(), room.id());
    Ok(())
}

pub fn random_choices(count: usize) -> Vec<Choice> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| if rng.gen_bool(0.5) { Choice::A } else { Choice::B })
        .collect()
}
