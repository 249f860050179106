use crate::settlement::{settle, GameResult, Outcome};
use crate::{Amount, GameError, Player, Result};
use chrono::{DateTime, Utc};
use minority_seal::{BatchDecryption, Choice, SealSession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    Full,
    Revealed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    id: String,
    name: String,
    description: String,
    bet_amount: Amount,
    max_players: usize,
    status: RoomStatus,
    players: Vec<Player>,
    result: Option<GameResult>,
    is_demo: bool,
    created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: impl Into<String>, bet_amount: Amount, max_players: usize) -> Result<Self> {
        Self::with_id(format!("room-{}", Uuid::new_v4()), name, bet_amount, max_players)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        bet_amount: Amount,
        max_players: usize,
    ) -> Result<Self> {
        if bet_amount == Amount::ZERO {
            return Err(GameError::InvalidBetAmount(
                "Bet must be greater than 0".to_string(),
            ));
        }

        if max_players < 2 {
            return Err(GameError::InvalidState(format!(
                "A room needs at least 2 seats, got {}",
                max_players
            )));
        }

        if bet_amount.checked_mul(max_players as u64).is_none() {
            return Err(GameError::InvalidBetAmount(format!(
                "A full room of {} at {} overflows the prize pool",
                max_players, bet_amount
            )));
        }

        Ok(Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            bet_amount,
            max_players,
            status: RoomStatus::Waiting,
            players: Vec::new(),
            result: None,
            is_demo: false,
            created_at: Utc::now(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn mark_demo(mut self) -> Self {
        self.is_demo = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn bet_amount(&self) -> Amount {
        self.bet_amount
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn current_players(&self) -> usize {
        self.players.len()
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn is_demo(&self) -> bool {
        self.is_demo
    }

    /// Bets staked so far, `None` if the total does not fit in a `u64`.
    pub fn prize_pool(&self) -> Option<Amount> {
        self.bet_amount.checked_mul(self.players.len() as u64)
    }

    pub fn player(&self, address: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.address() == address)
    }

    fn player_mut(&mut self, address: &str) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.address() == address)
            .ok_or_else(|| GameError::PlayerNotFound(address.to_string()))
    }

    pub(crate) fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    /// Revealed `(A, B)` counts.
    pub fn choice_distribution(&self) -> (usize, usize) {
        self.players
            .iter()
            .filter_map(|p| p.revealed_choice())
            .fold((0, 0), |(a, b), c| match c {
                Choice::A => (a + 1, b),
                Choice::B => (a, b + 1),
            })
    }

    pub fn join(&mut self, address: impl Into<String>, name: impl Into<String>) -> Result<()> {
        self.seat(Player::new(address, name))
    }

    pub(crate) fn seat(&mut self, player: Player) -> Result<()> {
        match self.status {
            RoomStatus::Waiting => {}
            RoomStatus::Full => return Err(GameError::RoomFull),
            RoomStatus::Revealed => {
                return Err(GameError::InvalidState(
                    "Room has already been revealed".to_string(),
                ))
            }
        }

        if self.player(player.address()).is_some() {
            return Err(GameError::AlreadyJoined(player.address().to_string()));
        }

        tracing::info!("Player {} joined room {}", player.address(), self.id);
        self.players.push(player);

        if self.players.len() == self.max_players {
            self.status = RoomStatus::Full;
            tracing::info!("Room {} is full", self.id);
        }

        Ok(())
    }

    pub(crate) fn check_session(&self, session: &SealSession) -> Result<()> {
        if session.room_id() != self.id {
            return Err(GameError::InvalidState(format!(
                "Session is for room '{}', not '{}'",
                session.room_id(),
                self.id
            )));
        }
        Ok(())
    }

    /// Record a player's sealed choice.
    pub async fn submit_choice(
        &mut self,
        session: &SealSession,
        address: &str,
        encrypted: String,
    ) -> Result<()> {
        if self.status == RoomStatus::Revealed {
            return Err(GameError::InvalidState(
                "Room has already been revealed".to_string(),
            ));
        }
        self.check_session(session)?;

        if !session.validate_encrypted_data(&encrypted).await {
            return Err(GameError::InvalidChoice(address.to_string()));
        }

        self.player_mut(address)?.submit_choice(encrypted)
    }

    /// Seal `choice` for `address` and submit it.
    pub async fn seal_choice(
        &mut self,
        session: &SealSession,
        address: &str,
        choice: Choice,
    ) -> Result<String> {
        self.check_session(session)?;
        if self.player(address).is_none() {
            return Err(GameError::PlayerNotFound(address.to_string()));
        }

        let encrypted = session.encrypt_choice(choice).await?;
        self.submit_choice(session, address, encrypted.clone()).await?;
        Ok(encrypted)
    }

    pub fn can_reveal(&self) -> bool {
        self.status == RoomStatus::Full && self.players.iter().all(|p| p.has_committed())
    }

    fn ensure_revealable(&self) -> Result<()> {
        match self.status {
            RoomStatus::Full => {}
            RoomStatus::Waiting => {
                return Err(GameError::RoomNotReady(format!(
                    "{}/{} players",
                    self.players.len(),
                    self.max_players
                )))
            }
            RoomStatus::Revealed => {
                return Err(GameError::InvalidState(
                    "Room has already been revealed".to_string(),
                ))
            }
        }
        Ok(())
    }

    /// Open every sealed choice and settle the room.
    pub async fn reveal(&mut self, session: &SealSession) -> Result<&GameResult> {
        self.ensure_revealable()?;
        self.check_session(session)?;

        let submissions = self
            .players
            .iter()
            .map(|p| {
                p.encrypted_choice()
                    .map(|c| (p.address().to_string(), c.to_string()))
                    .ok_or_else(|| {
                        GameError::RoomNotReady(format!("{} has not chosen", p.address()))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = session.decrypt_submissions(&submissions).await?;
        self.record_reveal(batch)
    }

    /// Settle the room from opened choices and apply the outcome.
    ///
    /// Players whose choice failed to open are refunded and left out of the
    /// pool. Nothing is changed unless settlement succeeds.
    pub(crate) fn record_reveal(&mut self, batch: BatchDecryption) -> Result<&GameResult> {
        self.ensure_revealable()?;

        let unknown = batch
            .revealed
            .iter()
            .map(|r| r.player.as_str())
            .chain(batch.failures.iter().map(|f| f.player.as_str()))
            .find(|address| self.player(address).is_none());
        if let Some(address) = unknown {
            return Err(GameError::PlayerNotFound(address.to_string()));
        }

        let result = settle(self.bet_amount, &batch.revealed)?;
        let bet = self.bet_amount;

        for failure in &batch.failures {
            self.player_mut(&failure.player)?.set_refunded(bet);
            tracing::warn!(
                "Refunding {} in room {}: {}",
                failure.player,
                self.id,
                failure.reason
            );
        }

        for revealed in &batch.revealed {
            let player = self.player_mut(&revealed.player)?;
            player.reveal(revealed.choice);
            match result.outcome {
                Outcome::Minority(choice) if revealed.choice == choice => {
                    player.set_winner(result.prize_per_winner)
                }
                Outcome::Minority(_) => player.set_loser(),
                Outcome::Refund(_) => player.set_refunded(bet),
            }
        }

        tracing::info!(
            "Room {} revealed: A={} B={} outcome={:?} prize={}",
            self.id,
            result.total_a,
            result.total_b,
            result.outcome,
            result.prize_per_winner
        );

        self.status = RoomStatus::Revealed;
        let result = self.result.insert(result);
        Ok(&*result)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            bet_amount: self.bet_amount,
            current_players: self.players.len(),
            max_players: self.max_players,
            prize_pool: self.prize_pool(),
            winner_choice: self.result.as_ref().and_then(|r| r.winner_choice()),
            is_demo: self.is_demo,
            created_at: self.created_at,
        }
    }
}

/// Room info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub status: RoomStatus,
    pub bet_amount: Amount,
    pub current_players: usize,
    pub max_players: usize,
    pub prize_pool: Option<Amount>,
    pub winner_choice: Option<Choice>,
    pub is_demo: bool,
    pub created_at: DateTime<Utc>,
}
