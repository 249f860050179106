//! Sealed choices for the minority-wins game.
//!
//! Players seal an `A`/`B` choice under a per-room session key; at reveal
//! time the room opens every sealed choice with the same key. The
//! ChaCha20Poly1305 cipher behind [`ChoiceCipher`] stands in for an
//! on-chain threshold scheme and can be swapped without touching callers.

pub mod config;
pub mod error;
pub mod seal;
pub mod session;
pub mod types;

pub use config::{Network, SealConfig};
pub use error::{Result, SealError};
pub use seal::{AeadCipher, ChoiceCipher, SealService};
pub use session::{SealSession, SessionState, SessionStatus};
pub use types::{
    BatchDecryption, Choice, DecryptFailure, DecryptedChoice, EncryptedDataInfo, SessionKey,
    SessionKeyPayload,
};

use std::sync::Arc;

/// Build a service from `config` and open a session for `room_id`.
pub async fn open_session(config: SealConfig, room_id: &str) -> Result<Arc<SealSession>> {
    let service = Arc::new(SealService::new(config)?);
    let session = Arc::new(SealSession::new(service, room_id));
    session.open().await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_session() {
        let config = SealConfig {
            kdf_iterations: 1,
            ..SealConfig::default()
        };
        let session = open_session(config, "demo-3").await.unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        let sealed = session.encrypt_choice(Choice::B).await.unwrap();
        assert_eq!(session.decrypt_choice(&sealed).await.unwrap(), Choice::B);
    }
}
