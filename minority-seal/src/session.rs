//! Per-room sealing session.
//!
//! A [`SealSession`] owns the session key for one room together with the
//! busy/error flags a front-end renders. It is opened and closed explicitly
//! and shared behind an `Arc`; every method takes `&self`.
//!
//! Overlapping calls are allowed. Each call raises its busy flag for its own
//! duration and clears it when it finishes, so two concurrent encryptions can
//! clear each other's indicator early.

use crate::error::{Result, SealError};
use crate::seal::SealService;
use crate::types::{BatchDecryption, Choice, EncryptedDataInfo, SessionKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Encrypting,
    Decrypting,
    Error,
}

/// Point-in-time copy of the session flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub session_key: Option<SessionKey>,
    pub is_encrypting: bool,
    pub is_decrypting: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct SessionFlags {
    session_key: Option<SessionKey>,
    initializing: bool,
    is_encrypting: bool,
    is_decrypting: bool,
    error: Option<String>,
    // bumped by reset so late results from a previous session are dropped
    generation: u64,
}

impl SessionFlags {
    fn state(&self) -> SessionState {
        if self.initializing {
            SessionState::Initializing
        } else if self.is_encrypting {
            SessionState::Encrypting
        } else if self.is_decrypting {
            SessionState::Decrypting
        } else if self.session_key.is_some() {
            SessionState::Ready
        } else if self.error.is_some() {
            SessionState::Error
        } else {
            SessionState::Uninitialized
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Busy {
    Encrypting,
    Decrypting,
}

/// Clears a busy flag on every exit path, including a dropped future.
///
/// Remembers the session generation it was raised in; once the session is
/// reset it no longer touches the flags.
struct BusyGuard<'a> {
    flags: &'a RwLock<SessionFlags>,
    busy: Busy,
    generation: u64,
}

impl<'a> BusyGuard<'a> {
    fn raise(flags: &'a RwLock<SessionFlags>, busy: Busy) -> Self {
        let generation = {
            let mut f = flags.write();
            match busy {
                Busy::Encrypting => f.is_encrypting = true,
                Busy::Decrypting => f.is_decrypting = true,
            }
            f.error = None;
            f.generation
        };
        Self {
            flags,
            busy,
            generation,
        }
    }

    /// Record a failed result unless the session was reset meanwhile.
    fn capture<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            let mut f = self.flags.write();
            if f.generation == self.generation {
                f.error = Some(e.to_string());
            }
        }
        result
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut f = self.flags.write();
        if f.generation != self.generation {
            return;
        }
        match self.busy {
            Busy::Encrypting => f.is_encrypting = false,
            Busy::Decrypting => f.is_decrypting = false,
        }
    }
}

pub struct SealSession {
    service: Arc<SealService>,
    room_id: String,
    flags: RwLock<SessionFlags>,
}

impl SealSession {
    pub fn new(service: Arc<SealService>, room_id: impl Into<String>) -> Self {
        Self {
            service,
            room_id: room_id.into(),
            flags: RwLock::new(SessionFlags::default()),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn service(&self) -> &SealService {
        &self.service
    }

    pub fn session_key(&self) -> Option<SessionKey> {
        self.flags.read().session_key.clone()
    }

    pub fn state(&self) -> SessionState {
        self.flags.read().state()
    }

    pub fn is_encrypting(&self) -> bool {
        self.flags.read().is_encrypting
    }

    pub fn is_decrypting(&self) -> bool {
        self.flags.read().is_decrypting
    }

    pub fn error(&self) -> Option<String> {
        self.flags.read().error.clone()
    }

    pub fn status(&self) -> SessionStatus {
        let f = self.flags.read();
        SessionStatus {
            state: f.state(),
            session_key: f.session_key.clone(),
            is_encrypting: f.is_encrypting,
            is_decrypting: f.is_decrypting,
            error: f.error.clone(),
        }
    }

    /// Generate and store a new session key for the room.
    pub async fn open(&self) -> Result<SessionKey> {
        let generation = {
            let mut f = self.flags.write();
            f.initializing = true;
            f.error = None;
            f.generation
        };

        let result = if self.room_id.is_empty() {
            Err(SealError::validation("Cannot open a session without a room id"))
        } else {
            self.service.generate_session_key(&self.room_id).await
        };

        let mut f = self.flags.write();
        if f.generation != generation {
            tracing::debug!(
                "Session for room {} was reset while opening, discarding key",
                self.room_id
            );
            return Err(SealError::SessionNotInitialized);
        }
        f.initializing = false;

        match result {
            Ok(key) => {
                f.session_key = Some(key.clone());
                tracing::info!("Session {} opened for room {}", key.fingerprint(), self.room_id);
                Ok(key)
            }
            Err(e) => {
                f.error = Some(e.to_string());
                tracing::warn!("Failed to open session for room {}: {}", self.room_id, e);
                Err(e)
            }
        }
    }

    /// Open the session if there is a room id and no key yet.
    ///
    /// Returns the key held afterwards, or `None` when the room id is empty.
    pub async fn ensure_open(&self) -> Result<Option<SessionKey>> {
        if self.room_id.is_empty() {
            return Ok(None);
        }

        if let Some(key) = self.session_key() {
            return Ok(Some(key));
        }

        self.open().await.map(Some)
    }

    fn require_key(&self) -> Result<SessionKey> {
        self.session_key().ok_or(SealError::SessionNotInitialized)
    }

    pub async fn encrypt_choice(&self, choice: Choice) -> Result<String> {
        let key = self.require_key()?;
        let busy = BusyGuard::raise(&self.flags, Busy::Encrypting);

        let result = self
            .service
            .encrypt_choice(choice, &self.room_id, &key)
            .await;
        busy.capture(result)
    }

    pub async fn decrypt_choice(&self, encrypted: &str) -> Result<Choice> {
        let key = self.require_key()?;
        let busy = BusyGuard::raise(&self.flags, Busy::Decrypting);

        let result = self.service.decrypt_choice(encrypted, &key).await;
        busy.capture(result)
    }

    pub async fn decrypt_all_choices<S: AsRef<str>>(
        &self,
        encrypted_choices: &[S],
    ) -> Result<BatchDecryption> {
        let key = self.require_key()?;
        let _busy = BusyGuard::raise(&self.flags, Busy::Decrypting);

        Ok(self.service.decrypt_all_choices(encrypted_choices, &key).await)
    }

    pub async fn decrypt_submissions(
        &self,
        submissions: &[(String, String)],
    ) -> Result<BatchDecryption> {
        let key = self.require_key()?;
        let _busy = BusyGuard::raise(&self.flags, Busy::Decrypting);

        Ok(self.service.decrypt_submissions(submissions, &key).await)
    }

    pub async fn validate_encrypted_data(&self, encrypted: &str) -> bool {
        self.flags.write().error = None;
        self.service
            .validate_encrypted_data(encrypted, &self.room_id)
            .await
    }

    pub fn get_encrypted_data_info(&self, encrypted: &str) -> EncryptedDataInfo {
        self.service.get_encrypted_data_info(encrypted)
    }

    pub fn clear_error(&self) {
        self.flags.write().error = None;
    }

    /// Drop the key and all flags, returning to `Uninitialized`.
    pub fn reset(&self) {
        let mut f = self.flags.write();
        let generation = f.generation.wrapping_add(1);
        *f = SessionFlags {
            generation,
            ..SessionFlags::default()
        };
    }

    pub fn close(&self) {
        self.reset();
        tracing::info!("Session for room {} closed", self.room_id);
    }
}

impl std::fmt::Debug for SealSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealSession")
            .field("room_id", &self.room_id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SealConfig;
    use crate::seal::{AeadCipher, ChoiceCipher};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn fast_service() -> Arc<SealService> {
        let config = SealConfig {
            kdf_iterations: 1,
            ..SealConfig::default()
        };
        Arc::new(SealService::new(config).unwrap())
    }

    /// AEAD cipher whose steps can each be held until a gate is notified.
    #[derive(Default)]
    struct GatedCipher {
        seal_gate: Option<Arc<Notify>>,
        open_gate: Option<Arc<Notify>>,
        key_gate: Option<Arc<Notify>>,
    }

    async fn pass(gate: &Option<Arc<Notify>>) {
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    #[async_trait]
    impl ChoiceCipher for GatedCipher {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn seal(&self, plaintext: &[u8], key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>> {
            pass(&self.seal_gate).await;
            AeadCipher::new(1).seal(plaintext, key, aad).await
        }

        async fn open(&self, frame: &[u8], key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>> {
            pass(&self.open_gate).await;
            AeadCipher::new(1).open(frame, key, aad).await
        }

        async fn key_entropy(&self) -> Result<String> {
            pass(&self.key_gate).await;
            AeadCipher::new(1).key_entropy().await
        }
    }

    fn gated_session(cipher: GatedCipher) -> Arc<SealSession> {
        let config = SealConfig {
            kdf_iterations: 1,
            ..SealConfig::default()
        };
        let service = Arc::new(SealService::with_cipher(config, Arc::new(cipher)).unwrap());
        Arc::new(SealSession::new(service, "room-1"))
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let session = SealSession::new(fast_service(), "room-1");
        assert_eq!(session.state(), SessionState::Uninitialized);

        let key = session.open().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(key.room_id().unwrap(), "room-1");

        let sealed = session.encrypt_choice(Choice::A).await.unwrap();
        assert!(session.validate_encrypted_data(&sealed).await);
        assert_eq!(session.decrypt_choice(&sealed).await.unwrap(), Choice::A);
        assert_eq!(session.state(), SessionState::Ready);

        session.close();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.session_key().is_none());
    }

    #[tokio::test]
    async fn test_operations_require_session_key() {
        let session = SealSession::new(fast_service(), "room-1");

        let err = session.encrypt_choice(Choice::B).await.unwrap_err();
        assert!(matches!(err, SealError::SessionNotInitialized));
        assert!(matches!(
            session.decrypt_choice("encrypted_x").await,
            Err(SealError::SessionNotInitialized)
        ));
        assert!(matches!(
            session.decrypt_all_choices(&["encrypted_x"]).await,
            Err(SealError::SessionNotInitialized)
        ));

        // precondition failures never touch the flags
        let status = session.status();
        assert_eq!(status.state, SessionState::Uninitialized);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_ensure_open_is_lazy() {
        let session = SealSession::new(fast_service(), "room-1");
        let first = session.ensure_open().await.unwrap().unwrap();
        let second = session.ensure_open().await.unwrap().unwrap();
        assert_eq!(first, second);

        let empty = SealSession::new(fast_service(), "");
        assert!(empty.ensure_open().await.unwrap().is_none());
        assert_eq!(empty.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_open_failure_enters_error_state() {
        let session = SealSession::new(fast_service(), "");
        assert!(session.open().await.is_err());

        let status = session.status();
        assert_eq!(status.state, SessionState::Error);
        assert!(status.error.unwrap().contains("room id"));

        session.reset();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_failed_decrypt_records_error_and_stays_ready() {
        let session = SealSession::new(fast_service(), "room-1");
        session.open().await.unwrap();

        let err = session.decrypt_choice("encrypted_garbage").await.unwrap_err();
        assert!(matches!(err, SealError::Decryption(_)));

        let status = session.status();
        assert_eq!(status.state, SessionState::Ready);
        assert!(!status.is_decrypting);
        assert!(status.error.is_some());

        session.clear_error();
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_validate_clears_error_and_never_raises() {
        let session = SealSession::new(fast_service(), "room-1");
        session.open().await.unwrap();
        let _ = session.decrypt_choice("nope").await;
        assert!(session.error().is_some());

        assert!(!session.validate_encrypted_data("nope").await);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_batch_through_session() {
        let session = SealSession::new(fast_service(), "room-1");
        session.open().await.unwrap();

        let a = session.encrypt_choice(Choice::A).await.unwrap();
        let b = session.encrypt_choice(Choice::B).await.unwrap();
        let batch = session
            .decrypt_all_choices(&[a, "encrypted_bad".to_string(), b])
            .await
            .unwrap();

        assert_eq!(batch.revealed.len(), 2);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].index, 1);
        assert!(!session.is_decrypting());
    }

    #[tokio::test]
    async fn test_overlapping_encryptions() {
        let session = Arc::new(SealSession::new(fast_service(), "room-1"));
        session.open().await.unwrap();

        let calls = (0..8).map(|i| {
            let session = session.clone();
            async move {
                let choice = if i % 2 == 0 { Choice::A } else { Choice::B };
                (choice, session.encrypt_choice(choice).await.unwrap())
            }
        });
        let sealed = futures::future::join_all(calls).await;

        assert!(!session.is_encrypting());
        for (choice, ciphertext) in sealed {
            assert_eq!(session.decrypt_choice(&ciphertext).await.unwrap(), choice);
        }
    }

    #[tokio::test]
    async fn test_aborted_encrypt_clears_busy_flag() {
        let gate = Arc::new(Notify::new());
        let session = gated_session(GatedCipher {
            seal_gate: Some(gate.clone()),
            ..GatedCipher::default()
        });
        session.open().await.unwrap();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.encrypt_choice(Choice::A).await })
        };

        while !session.is_encrypting() {
            tokio::task::yield_now().await;
        }
        assert_eq!(session.state(), SessionState::Encrypting);

        task.abort();
        let _ = task.await;
        assert!(!session.is_encrypting());
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_gated_encrypt_completes_once_released() {
        let gate = Arc::new(Notify::new());
        let session = gated_session(GatedCipher {
            seal_gate: Some(gate.clone()),
            ..GatedCipher::default()
        });
        session.open().await.unwrap();

        gate.notify_one();
        let sealed = session.encrypt_choice(Choice::B).await.unwrap();
        assert_eq!(session.decrypt_choice(&sealed).await.unwrap(), Choice::B);
    }

    #[tokio::test]
    async fn test_failure_after_reset_does_not_touch_new_session() {
        let gate = Arc::new(Notify::new());
        let session = gated_session(GatedCipher {
            open_gate: Some(gate.clone()),
            ..GatedCipher::default()
        });
        session.open().await.unwrap();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.decrypt_choice("encrypted_AAAA").await })
        };
        while !session.is_decrypting() {
            tokio::task::yield_now().await;
        }

        session.reset();
        assert_eq!(session.state(), SessionState::Uninitialized);

        gate.notify_one();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(SealError::Decryption(_))));

        let status = session.status();
        assert_eq!(status.state, SessionState::Uninitialized);
        assert!(status.error.is_none());
        assert!(!status.is_decrypting);
    }

    #[tokio::test]
    async fn test_open_interrupted_by_reset_is_discarded() {
        let gate = Arc::new(Notify::new());
        let session = gated_session(GatedCipher {
            key_gate: Some(gate.clone()),
            ..GatedCipher::default()
        });

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.open().await })
        };
        while session.state() != SessionState::Initializing {
            tokio::task::yield_now().await;
        }

        session.reset();
        gate.notify_one();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(SealError::SessionNotInitialized)));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.session_key().is_none());

        gate.notify_one();
        session.open().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }
}
