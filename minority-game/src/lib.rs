//! Minority-wins rooms
//!
//! Every player in a room pays the same bet and seals a choice of `A` or
//! `B`. Once the room is full the sealed choices are opened together and
//! the side with fewer players splits the pool.

pub mod amount;
pub mod demo;
pub mod error;
pub mod player;
pub mod room;
pub mod settlement;

pub use amount::{Amount, MIST_PER_SUI};
pub use error::{GameError, Result};
pub use player::{Player, PlayerState};
pub use room::{Room, RoomInfo, RoomStatus};
pub use settlement::{minority, settle, GameResult, Outcome, RefundReason};

use minority_seal::{SealService, SealSession};
use std::sync::Arc;

/// Create an empty room.
pub fn create_room(name: &str, bet_amount: Amount, max_players: usize) -> Result<Room> {
    Room::new(name, bet_amount, max_players)
}

/// Open a sealing session scoped to `room`.
pub async fn open_room_session(service: Arc<SealService>, room: &Room) -> Result<Arc<SealSession>> {
    let session = Arc::new(SealSession::new(service, room.id()));
    session.open().await?;
    Ok(session)
}
