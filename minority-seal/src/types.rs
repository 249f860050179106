use crate::error::{Result, SealError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// One of the two sides a player can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
}

impl Choice {
    pub const ALL: [Choice; 2] = [Choice::A, Choice::B];

    pub fn other(self) -> Self {
        match self {
            Choice::A => Choice::B,
            Choice::B => Choice::A,
        }
    }

    pub fn random() -> Self {
        if rand::random::<bool>() {
            Choice::A
        } else {
            Choice::B
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::A => write!(f, "A"),
            Choice::B => write!(f, "B"),
        }
    }
}

impl FromStr for Choice {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "A" | "a" => Ok(Choice::A),
            "B" | "b" => Ok(Choice::B),
            other => Err(SealError::validation(format!(
                "Invalid choice '{}', expected A or B",
                other
            ))),
        }
    }
}

/// Decoded contents of a session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKeyPayload {
    pub room_id: String,
    pub timestamp: i64, // ms since epoch
    pub random: String,
}

/// Opaque per-room session token.
///
/// The token is base64 over a JSON [`SessionKeyPayload`]; it scopes sealed
/// choices to a room but is not itself a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_payload(payload: &SessionKeyPayload) -> Result<Self> {
        let json = serde_json::to_vec(payload)?;
        Ok(Self(STANDARD.encode(json)))
    }

    pub fn payload(&self) -> Result<SessionKeyPayload> {
        let bytes = STANDARD
            .decode(self.0.as_bytes())
            .map_err(|e| SealError::validation(format!("Session key is not base64: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| SealError::validation(format!("Malformed session key payload: {}", e)))
    }

    pub fn room_id(&self) -> Result<String> {
        Ok(self.payload()?.room_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex digest for log lines.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl From<String> for SessionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A revealed choice paired with the player it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedChoice {
    pub player: String,
    pub choice: Choice,
}

/// A batch entry that could not be opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptFailure {
    pub index: usize,
    pub player: String,
    pub reason: String,
}

/// Outcome of a batch decryption. One bad entry never aborts the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDecryption {
    pub revealed: Vec<DecryptedChoice>,
    pub failures: Vec<DecryptFailure>,
}

impl BatchDecryption {
    pub fn total(&self) -> usize {
        self.revealed.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedDataInfo {
    pub size: usize,
    pub preview: String,
    pub is_encrypted: bool,
}

/// Placeholder address for the n-th (0-based) entry of an anonymous batch.
pub fn player_address_for_index(index: usize) -> String {
    format!("0x{:040x}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_parsing() {
        assert_eq!("A".parse::<Choice>().unwrap(), Choice::A);
        assert_eq!(" b ".parse::<Choice>().unwrap(), Choice::B);
        assert!("C".parse::<Choice>().is_err());
        assert_eq!(Choice::A.other(), Choice::B);
        assert_eq!(Choice::B.to_string(), "B");
    }

    #[test]
    fn test_session_key_embeds_room_id() {
        let payload = SessionKeyPayload {
            room_id: "room-1".to_string(),
            timestamp: 1_700_000_000_000,
            random: "k3j9x".to_string(),
        };
        let key = SessionKey::from_payload(&payload).unwrap();

        assert_eq!(key.payload().unwrap(), payload);
        assert_eq!(key.room_id().unwrap(), "room-1");
        assert_eq!(key.fingerprint().len(), 12);
    }

    #[test]
    fn test_garbage_session_key_rejected() {
        let key = SessionKey::from("not base64 at all!");
        assert!(matches!(key.room_id(), Err(SealError::Validation(_))));

        let key = SessionKey::from(STANDARD.encode(b"[1,2,3]"));
        assert!(key.payload().is_err());
    }

    #[test]
    fn test_placeholder_addresses() {
        let first = player_address_for_index(0);
        assert_eq!(first.len(), 42);
        assert_eq!(first, format!("0x{}1", "0".repeat(39)));
        assert!(player_address_for_index(15).ends_with("10"));
    }

    #[test]
    fn test_info_serializes_camel_case() {
        let info = EncryptedDataInfo {
            size: 3,
            preview: "abc".to_string(),
            is_encrypted: false,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["isEncrypted"], false);
    }
}
