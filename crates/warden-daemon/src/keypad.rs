//! Keypad event processing
//!
//! Consumes the debounced key/button event stream, accumulates the
//! password buffer in the shared state, and on the terminator key
//! either stores a new credential or verifies the entered one. The
//! CPU-bound derivation runs on a blocking worker against a locally
//! copied buffer; the state lock is never held across it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use warden_core::{Credential, EntryMode, EntryOutcome, SharedLockState, TERMINATOR_KEY};

use crate::store::CredentialStore;

/// A single event from the keypad/button driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A keypad character was pressed (already debounced)
    Key(char),
    /// The reset pushbutton was pressed
    Reset,
}

/// Turns key events into lock-state transitions
pub struct KeypadEventProcessor {
    state: SharedLockState,
    store: Arc<dyn CredentialStore>,
    username: String,
    hash_iterations: u32,
}

impl KeypadEventProcessor {
    pub fn new(
        state: SharedLockState,
        store: Arc<dyn CredentialStore>,
        username: String,
        hash_iterations: u32,
    ) -> Self {
        Self {
            state,
            store,
            username,
            hash_iterations,
        }
    }

    /// Consume events until the driver side closes the channel.
    pub async fn run(self, mut events: mpsc::Receiver<KeyEvent>) {
        info!("keypad processor started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("keypad channel closed, processor exiting");
    }

    /// Process one event.
    pub async fn handle_event(&self, event: KeyEvent) {
        match event {
            KeyEvent::Reset => {
                info!("reset button pressed, awaiting new password");
                self.state.begin_reset();
            }
            KeyEvent::Key(key) if key == TERMINATOR_KEY => {
                self.handle_terminator().await;
            }
            KeyEvent::Key(key) => {
                self.state.append_key(key);
                debug!(len = self.state.snapshot().buffer.len(), "key accumulated");
            }
        }
    }

    /// Terminator press: take the buffered entry atomically, evaluate
    /// it outside the lock, and commit the outcome (unless a reset
    /// press arrived in the meantime, in which case the outcome is
    /// dropped).
    async fn handle_terminator(&self) {
        let entry = self.state.take_entry();

        let outcome = match entry.mode {
            EntryMode::Store => self.store_new_credential(&entry.password).await,
            EntryMode::Verify => self.verify_entry(&entry.password).await,
        };

        if !self.state.complete_entry(&entry, outcome) {
            info!("entry outcome superseded by a newer reset press");
        }
    }

    async fn store_new_credential(&self, password: &str) -> EntryOutcome {
        let derived = self.derive(password).await;
        let credential = match derived {
            Some(credential) => credential,
            None => return EntryOutcome::StoreRejected,
        };

        match self.store.put(&self.username, &credential.encode()).await {
            Ok(()) => {
                info!(username = %self.username, "new credential stored");
                EntryOutcome::Stored
            }
            Err(e) => {
                // Must not pretend to succeed without persistence
                warn!(error = %e, "credential store rejected write, keeping old password");
                EntryOutcome::StoreRejected
            }
        }
    }

    async fn verify_entry(&self, password: &str) -> EntryOutcome {
        let encoded = match self.store.get(&self.username).await {
            Ok(Some(encoded)) => encoded,
            Ok(None) => {
                warn!(username = %self.username, "no stored credential, rejecting entry");
                return EntryOutcome::Failed;
            }
            Err(e) => {
                warn!(error = %e, "credential store unavailable, rejecting entry");
                return EntryOutcome::Failed;
            }
        };

        let credential = match Credential::decode(&encoded) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "stored credential undecodable, rejecting entry");
                return EntryOutcome::Failed;
            }
        };

        let iterations = self.hash_iterations;
        let password = Zeroizing::new(password.to_string());
        let verified = tokio::task::spawn_blocking(move || credential.verify(&password, iterations))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "verification task panicked");
                false
            });

        if verified {
            info!("password verified, unlocking");
            EntryOutcome::Unlocked
        } else {
            info!("password rejected");
            EntryOutcome::Failed
        }
    }

    async fn derive(&self, password: &str) -> Option<Credential> {
        let iterations = self.hash_iterations;
        let password = Zeroizing::new(password.to_string());
        let result =
            tokio::task::spawn_blocking(move || Credential::derive(&password, iterations)).await;
        match result {
            Ok(Ok(credential)) => Some(credential),
            Ok(Err(e)) => {
                error!(error = %e, "credential derivation failed");
                None
            }
            Err(e) => {
                error!(error = %e, "derivation task panicked");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use warden_core::LockStatus;

    const TEST_ITERS: u32 = 1_000;

    fn processor_with(store: Arc<MemoryCredentialStore>) -> (KeypadEventProcessor, SharedLockState) {
        let state = SharedLockState::new();
        let processor = KeypadEventProcessor::new(
            state.clone(),
            store,
            "warden".to_string(),
            TEST_ITERS,
        );
        (processor, state)
    }

    fn stored(password: &str) -> Arc<MemoryCredentialStore> {
        let credential = Credential::derive(password, TEST_ITERS).unwrap();
        Arc::new(MemoryCredentialStore::with_credential(
            "warden",
            &credential.encode(),
        ))
    }

    async fn type_keys(processor: &KeypadEventProcessor, keys: &str) {
        for key in keys.chars() {
            processor.handle_event(KeyEvent::Key(key)).await;
        }
    }

    #[tokio::test]
    async fn test_correct_password_unlocks() {
        let (processor, state) = processor_with(stored("1234"));
        type_keys(&processor, "1234").await;
        assert_eq!(state.status(), LockStatus::KeyPressed);

        type_keys(&processor, "#").await;
        let snap = state.snapshot();
        assert_eq!(snap.status, LockStatus::Unlocked);
        assert!(snap.buffer.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password_fails() {
        let (processor, state) = processor_with(stored("0000"));
        type_keys(&processor, "1234#").await;
        assert_eq!(state.status(), LockStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_buffer_terminator_verifies_empty_string() {
        let (processor, state) = processor_with(stored(""));
        type_keys(&processor, "#").await;
        assert_eq!(state.status(), LockStatus::Unlocked);

        type_keys(&processor, "#").await;
        assert_eq!(state.status(), LockStatus::Unlocked);
    }

    #[tokio::test]
    async fn test_reset_then_store_new_password() {
        let store = stored("1234");
        let (processor, state) = processor_with(store.clone());

        processor.handle_event(KeyEvent::Reset).await;
        assert_eq!(state.status(), LockStatus::ResetPassword);

        type_keys(&processor, "5555").await;
        // Accumulation during reset does not flip to KeyPressed
        assert_eq!(state.status(), LockStatus::ResetPassword);

        type_keys(&processor, "#").await;
        assert_eq!(state.status(), LockStatus::Locked);

        // The new credential is the one future verifications use
        type_keys(&processor, "5555#").await;
        assert_eq!(state.status(), LockStatus::Unlocked);

        type_keys(&processor, "1234#").await;
        assert_eq!(state.status(), LockStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_credential_rejects() {
        let (processor, state) = processor_with(Arc::new(MemoryCredentialStore::new()));
        type_keys(&processor, "1234#").await;
        assert_eq!(state.status(), LockStatus::Failed);
    }

    #[tokio::test]
    async fn test_corrupt_credential_rejects() {
        let store = Arc::new(MemoryCredentialStore::with_credential("warden", "nonsense"));
        let (processor, state) = processor_with(store);
        type_keys(&processor, "1234#").await;
        assert_eq!(state.status(), LockStatus::Failed);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let store = stored("1234");
        let (processor, state) = processor_with(store.clone());
        store.set_unavailable(true);

        // Verify path: outage reads as rejection
        type_keys(&processor, "1234#").await;
        assert_eq!(state.status(), LockStatus::Failed);

        // Store path: new password rejected, old one still in effect
        processor.handle_event(KeyEvent::Reset).await;
        type_keys(&processor, "5555#").await;
        assert_eq!(state.status(), LockStatus::Locked);

        store.set_unavailable(false);
        type_keys(&processor, "5555#").await;
        assert_eq!(state.status(), LockStatus::Failed);
        type_keys(&processor, "1234#").await;
        assert_eq!(state.status(), LockStatus::Unlocked);
    }

    #[tokio::test]
    async fn test_keys_accumulate_in_any_status() {
        let (processor, state) = processor_with(stored("12"));
        state.transition(LockStatus::Intruder);
        type_keys(&processor, "1").await;
        // Visual feedback still switches to KeyPressed; accumulation is
        // the part that must survive
        type_keys(&processor, "2#").await;
        assert_eq!(state.status(), LockStatus::Unlocked);
    }

    #[tokio::test]
    async fn test_run_drains_channel_until_close() {
        let (processor, state) = processor_with(stored("77"));
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(processor.run(rx));
        for key in "77#".chars() {
            tx.send(KeyEvent::Key(key)).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(state.status(), LockStatus::Unlocked);
    }
}
