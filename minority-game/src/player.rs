use crate::{Amount, GameError, Result};
use chrono::{DateTime, Utc};
use minority_seal::Choice;
use serde::{Deserialize, Serialize};

/// Player state in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Joined,
    Committed,
    Revealed,
    Winner,
    Loser,
    Refunded,
}

/// A seat in a minority-wins room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    address: String,
    name: String,
    joined_at: DateTime<Utc>,
    state: PlayerState,
    encrypted_choice: Option<String>,
    revealed_choice: Option<Choice>,
    payout: Amount,
}

impl Player {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self::joined_at(address, name, Utc::now())
    }

    pub fn joined_at(
        address: impl Into<String>,
        name: impl Into<String>,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            joined_at,
            state: PlayerState::Joined,
            encrypted_choice: None,
            revealed_choice: None,
            payout: Amount::ZERO,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join_time(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn has_committed(&self) -> bool {
        self.encrypted_choice.is_some()
    }

    pub fn has_revealed(&self) -> bool {
        self.revealed_choice.is_some()
    }

    pub fn encrypted_choice(&self) -> Option<&str> {
        self.encrypted_choice.as_deref()
    }

    pub fn revealed_choice(&self) -> Option<Choice> {
        self.revealed_choice
    }

    pub fn payout(&self) -> Amount {
        self.payout
    }

    pub fn is_winner(&self) -> bool {
        self.state == PlayerState::Winner
    }

    /// Store the sealed choice. Only one submission per player.
    pub fn submit_choice(&mut self, encrypted: String) -> Result<()> {
        if self.encrypted_choice.is_some() {
            return Err(GameError::ChoiceAlreadySubmitted(self.address.clone()));
        }

        self.encrypted_choice = Some(encrypted);
        self.state = PlayerState::Committed;

        tracing::debug!("Player {} submitted a sealed choice", self.address);
        Ok(())
    }

    /// Overwrite the sealed choice, used when seeding demo rooms.
    pub(crate) fn replace_choice(&mut self, encrypted: String) {
        self.encrypted_choice = Some(encrypted);
        self.revealed_choice = None;
        self.state = PlayerState::Committed;
    }

    pub fn reveal(&mut self, choice: Choice) {
        self.revealed_choice = Some(choice);
        self.state = PlayerState::Revealed;
    }

    pub fn set_winner(&mut self, prize: Amount) {
        self.state = PlayerState::Winner;
        self.payout = prize;
    }

    pub fn set_loser(&mut self) {
        self.state = PlayerState::Loser;
        self.payout = Amount::ZERO;
    }

    pub fn set_refunded(&mut self, amount: Amount) {
        self.state = PlayerState::Refunded;
        self.payout = amount;
    }
}
