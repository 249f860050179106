use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Seal error: {0}")]
    Seal(#[from] minority_seal::SealError),

    #[error("Invalid room state: {0}")]
    InvalidState(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Room is full")]
    RoomFull,

    #[error("Room not ready for reveal: {0}")]
    RoomNotReady(String),

    #[error("Player already joined: {0}")]
    AlreadyJoined(String),

    #[error("Choice already submitted by player: {0}")]
    ChoiceAlreadySubmitted(String),

    #[error("Invalid sealed choice from player: {0}")]
    InvalidChoice(String),

    #[error("Invalid bet amount: {0}")]
    InvalidBetAmount(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
