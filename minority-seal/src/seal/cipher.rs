use crate::error::{Result, SealError};
use crate::types::SessionKey;
use async_trait::async_trait;
use rand::distributions::{Alphanumeric, DistString};
use rand::RngCore;
use sha2::Sha256;

// ChaCha20Poly1305 for authenticated encryption
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};

const FRAME_VERSION: u8 = 1;
const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const HEADER_SIZE: usize = 1 + SALT_SIZE + NONCE_SIZE;
const KEY_ENTROPY_LEN: usize = 12;

/// Scheme used to seal a choice under a session key.
///
/// `aad` is bound to the ciphertext and must be presented again to open it.
#[async_trait]
pub trait ChoiceCipher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn seal(&self, plaintext: &[u8], key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>>;

    async fn open(&self, frame: &[u8], key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>>;

    /// Random component mixed into each new session key.
    async fn key_entropy(&self) -> Result<String> {
        Ok(Alphanumeric
            .sample_string(&mut rand::thread_rng(), KEY_ENTROPY_LEN)
            .to_lowercase())
    }
}

/// ChaCha20Poly1305 with a PBKDF2 key stretched from the session key.
///
/// Frame layout: `version || salt || nonce || ciphertext+tag`.
#[derive(Debug, Clone)]
pub struct AeadCipher {
    iterations: u32,
}

impl AeadCipher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive_key(&self, session_key: &SessionKey, salt: &[u8]) -> Key {
        use pbkdf2::pbkdf2_hmac;

        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(session_key.as_str().as_bytes(), salt, self.iterations, &mut key);
        *Key::from_slice(&key)
    }
}

#[async_trait]
impl ChoiceCipher for AeadCipher {
    fn name(&self) -> &'static str {
        "ChaCha20Poly1305"
    }

    async fn seal(&self, plaintext: &[u8], key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(&self.derive_key(key, &salt));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| SealError::encryption(format!("AEAD seal failed: {}", e)))?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        frame.push(FRAME_VERSION);
        frame.extend_from_slice(&salt);
        frame.extend_from_slice(&nonce);
        frame.extend_from_slice(&ciphertext);
        Ok(frame)
    }

    async fn open(&self, frame: &[u8], key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>> {
        if frame.len() <= HEADER_SIZE {
            return Err(SealError::decryption(format!(
                "Frame too short: {} bytes",
                frame.len()
            )));
        }

        if frame[0] != FRAME_VERSION {
            return Err(SealError::decryption(format!(
                "Unsupported frame version: {}",
                frame[0]
            )));
        }

        let salt = &frame[1..1 + SALT_SIZE];
        let nonce = Nonce::from_slice(&frame[1 + SALT_SIZE..HEADER_SIZE]);
        let ciphertext = &frame[HEADER_SIZE..];

        let cipher = ChaCha20Poly1305::new(&self.derive_key(key, salt));
        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| SealError::decryption("Authentication failed (wrong session key?)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SessionKey {
        SessionKey::from(s)
    }

    #[tokio::test]
    async fn test_seal_open() {
        let cipher = AeadCipher::new(1);
        let frame = cipher.seal(b"hello", &key("k1"), b"room").await.unwrap();

        assert_eq!(frame[0], FRAME_VERSION);
        let opened = cipher.open(&frame, &key("k1"), b"room").await.unwrap();
        assert_eq!(opened, b"hello");
    }

    #[tokio::test]
    async fn test_wrong_key_or_aad() {
        let cipher = AeadCipher::new(1);
        let frame = cipher.seal(b"hello", &key("k1"), b"room").await.unwrap();

        assert!(cipher.open(&frame, &key("k2"), b"room").await.is_err());
        assert!(cipher.open(&frame, &key("k1"), b"other").await.is_err());
    }

    #[tokio::test]
    async fn test_truncated_and_versioned_frames() {
        let cipher = AeadCipher::new(1);
        let mut frame = cipher.seal(b"x", &key("k"), b"").await.unwrap();

        assert!(cipher.open(&frame[..HEADER_SIZE], &key("k"), b"").await.is_err());

        frame[0] = 9;
        let err = cipher.open(&frame, &key("k"), b"").await.unwrap_err();
        assert!(err.to_string().contains("version"));
    }
}
