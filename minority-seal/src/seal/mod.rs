pub mod cipher;

pub use cipher::{AeadCipher, ChoiceCipher};

use crate::config::SealConfig;
use crate::error::{Result, SealError};
use crate::types::{
    player_address_for_index, BatchDecryption, Choice, DecryptFailure, DecryptedChoice,
    EncryptedDataInfo, SessionKey, SessionKeyPayload,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Plaintext sealed inside every encrypted choice.
///
/// The session key itself is never stored, only its fingerprint, which
/// must match the key presented on open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedChoice {
    choice: Choice,
    room_id: String,
    key_fingerprint: String,
    timestamp: i64,
}

/// Seals and opens player choices for a room.
pub struct SealService {
    config: SealConfig,
    cipher: Arc<dyn ChoiceCipher>,
}

impl SealService {
    pub fn new(config: SealConfig) -> Result<Self> {
        let cipher = Arc::new(AeadCipher::new(config.kdf_iterations));
        Self::with_cipher(config, cipher)
    }

    pub fn with_cipher(config: SealConfig, cipher: Arc<dyn ChoiceCipher>) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Seal service using {} on {:?}", cipher.name(), config.network);
        Ok(Self { config, cipher })
    }

    pub fn config(&self) -> &SealConfig {
        &self.config
    }

    pub fn marker(&self) -> &str {
        &self.config.marker
    }

    /// Create a fresh session key bound to `room_id`.
    pub async fn generate_session_key(&self, room_id: &str) -> Result<SessionKey> {
        let payload = SessionKeyPayload {
            room_id: room_id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            random: self.cipher.key_entropy().await?,
        };

        let key = SessionKey::from_payload(&payload)?;
        tracing::info!("Generated session key {} for room {}", key.fingerprint(), room_id);
        Ok(key)
    }

    pub async fn encrypt_choice(
        &self,
        choice: Choice,
        room_id: &str,
        session_key: &SessionKey,
    ) -> Result<String> {
        let key_room = session_key
            .room_id()
            .map_err(|e| SealError::encryption(e.to_string()))?;
        if key_room != room_id {
            return Err(SealError::encryption(format!(
                "Session key belongs to room '{}', not '{}'",
                key_room, room_id
            )));
        }

        let sealed = SealedChoice {
            choice,
            room_id: room_id.to_string(),
            key_fingerprint: session_key.fingerprint(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let plaintext = serde_json::to_vec(&sealed)?;

        let frame = self
            .cipher
            .seal(&plaintext, session_key, room_id.as_bytes())
            .await?;

        tracing::debug!("Sealed choice for room {} ({} bytes)", room_id, frame.len());
        Ok(format!("{}{}", self.config.marker, STANDARD.encode(frame)))
    }

    pub async fn decrypt_choice(&self, encrypted: &str, session_key: &SessionKey) -> Result<Choice> {
        let body = encrypted
            .strip_prefix(self.config.marker.as_str())
            .ok_or_else(|| SealError::decryption("Missing ciphertext marker"))?;

        let frame = STANDARD
            .decode(body.as_bytes())
            .map_err(|e| SealError::decryption(format!("Invalid base64: {}", e)))?;

        let room_id = session_key
            .room_id()
            .map_err(|e| SealError::decryption(e.to_string()))?;

        let plaintext = self
            .cipher
            .open(&frame, session_key, room_id.as_bytes())
            .await?;

        let sealed: SealedChoice = serde_json::from_slice(&plaintext)
            .map_err(|e| SealError::decryption(format!("Malformed sealed choice: {}", e)))?;

        if sealed.room_id != room_id {
            return Err(SealError::decryption(format!(
                "Sealed choice belongs to room '{}', not '{}'",
                sealed.room_id, room_id
            )));
        }

        if sealed.key_fingerprint != session_key.fingerprint() {
            return Err(SealError::decryption(format!(
                "Sealed under session {}, not {}",
                sealed.key_fingerprint,
                session_key.fingerprint()
            )));
        }

        tracing::debug!("Opened sealed choice for room {}", room_id);
        Ok(sealed.choice)
    }

    /// Open an anonymous batch. Entry `i` is attributed to
    /// [`player_address_for_index`]`(i)`.
    pub async fn decrypt_all_choices<S: AsRef<str>>(
        &self,
        encrypted_choices: &[S],
        session_key: &SessionKey,
    ) -> BatchDecryption {
        let submissions: Vec<(String, String)> = encrypted_choices
            .iter()
            .enumerate()
            .map(|(i, c)| (player_address_for_index(i), c.as_ref().to_string()))
            .collect();

        self.decrypt_submissions(&submissions, session_key).await
    }

    /// Open `(player, ciphertext)` pairs in order. Failed entries are
    /// logged and reported in [`BatchDecryption::failures`].
    pub async fn decrypt_submissions(
        &self,
        submissions: &[(String, String)],
        session_key: &SessionKey,
    ) -> BatchDecryption {
        let mut batch = BatchDecryption::default();

        for (index, (player, encrypted)) in submissions.iter().enumerate() {
            match self.decrypt_choice(encrypted, session_key).await {
                Ok(choice) => batch.revealed.push(DecryptedChoice {
                    player: player.clone(),
                    choice,
                }),
                Err(e) => {
                    tracing::warn!("Decryption failed for entry {} ({}): {}", index, player, e);
                    batch.failures.push(DecryptFailure {
                        index,
                        player: player.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch decryption: {} revealed, {} failed",
            batch.revealed.len(),
            batch.failures.len()
        );
        batch
    }

    /// Cheap marker check. Does not prove the payload opens.
    pub async fn validate_encrypted_data(&self, encrypted: &str, room_id: &str) -> bool {
        let valid = encrypted.starts_with(self.config.marker.as_str());
        if !valid {
            tracing::debug!("Rejected payload for room {}: missing marker", room_id);
        }
        valid
    }

    pub fn get_encrypted_data_info(&self, encrypted: &str) -> EncryptedDataInfo {
        let size = encrypted.chars().count();
        let preview = if size > self.config.preview_len {
            let head: String = encrypted.chars().take(self.config.preview_len).collect();
            format!("{}...", head)
        } else {
            encrypted.to_string()
        };

        EncryptedDataInfo {
            size,
            preview,
            is_encrypted: encrypted.starts_with(self.config.marker.as_str()),
        }
    }
}

impl std::fmt::Debug for SealService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealService")
            .field("cipher", &self.cipher.name())
            .field("network", &self.config.network)
            .field("marker", &self.config.marker)
            .finish()
    }
}
