//! Shared lock state
//!
//! The single source of truth read and written by the sensor loop, the
//! keypad processor, and the display scheduler. All fields live in one
//! record behind one mutex, so every reader sees a consistent snapshot
//! and a buffer update is never visible without its accompanying status
//! transition.
//!
//! Critical sections are a few field writes; the lock is never held
//! across an await, a sleep, or a credential derivation.

use std::sync::{Arc, Mutex};

use zeroize::Zeroizing;

use crate::status::LockStatus;

/// How a terminator press should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Verify the buffer against the stored credential
    Verify,
    /// Store the buffer as the new credential
    Store,
}

/// Result of handling a completed password entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Verification succeeded
    Unlocked,
    /// Verification failed (wrong password, missing or undecodable
    /// credential, store unavailable)
    Failed,
    /// A new credential was persisted; lock re-engages
    Stored,
    /// A new credential could not be persisted; lock stays engaged
    StoreRejected,
}

/// A consistent point-in-time view of the lock record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSnapshot {
    pub status: LockStatus,
    pub buffer: String,
    pub store_mode: bool,
}

/// A password entry removed from the record by [`SharedLockState::take_entry`].
///
/// Holds the buffer copy the hash runs on, plus the reset generation at
/// the time it was taken so a commit can detect a racing reset press.
pub struct PendingEntry {
    pub password: Zeroizing<String>,
    pub mode: EntryMode,
    generation: u64,
}

#[derive(Debug)]
struct LockRecord {
    status: LockStatus,
    buffer: String,
    store_mode: bool,
    /// Bumped on every reset-button press; in-flight verifications
    /// taken under an older generation must not commit.
    reset_generation: u64,
}

/// Cloneable handle to the shared lock record.
///
/// Created once at startup in [`LockStatus::Locked`]; mutated for the
/// process lifetime by the three producer contexts.
#[derive(Clone)]
pub struct SharedLockState {
    inner: Arc<Mutex<LockRecord>>,
}

impl SharedLockState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LockRecord {
                status: LockStatus::Locked,
                buffer: String::new(),
                store_mode: false,
                reset_generation: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LockRecord> {
        // A poisoned lock means a panic elsewhere already took the
        // process down a failing path; continuing with the record is
        // still safe (all states degrade toward Locked).
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Non-blocking-scale read of the current consistent state.
    pub fn snapshot(&self) -> LockSnapshot {
        let rec = self.lock();
        LockSnapshot {
            status: rec.status,
            buffer: rec.buffer.clone(),
            store_mode: rec.store_mode,
        }
    }

    /// Current status without copying the buffer.
    pub fn status(&self) -> LockStatus {
        self.lock().status
    }

    /// Set the status. Entering `ResetPassword` carries its side
    /// effects (cleared buffer, store mode armed) so use
    /// [`begin_reset`](Self::begin_reset) for that transition instead.
    pub fn transition(&self, new_status: LockStatus) {
        let mut rec = self.lock();
        if new_status == LockStatus::ResetPassword {
            Self::apply_reset(&mut rec);
        } else {
            rec.status = new_status;
        }
    }

    /// Status transition that only fires from an expected prior status.
    ///
    /// Returns `true` if the transition was applied. Used by the
    /// intrusion monitor and display scheduler so a stale decision
    /// (made from an old snapshot) cannot clobber a newer state.
    pub fn transition_from(&self, expected: LockStatus, new_status: LockStatus) -> bool {
        let mut rec = self.lock();
        if rec.status != expected {
            return false;
        }
        rec.status = new_status;
        true
    }

    /// Status transition that fires from any status except `excluded`.
    ///
    /// Returns the status that was replaced, or `None` if the record
    /// was in the excluded status and left untouched.
    pub fn transition_unless(
        &self,
        excluded: LockStatus,
        new_status: LockStatus,
    ) -> Option<LockStatus> {
        let mut rec = self.lock();
        if rec.status == excluded {
            return None;
        }
        let previous = rec.status;
        rec.status = new_status;
        Some(previous)
    }

    /// Append a key to the buffer and, unless a password reset is in
    /// progress, flag the press for the display (one atomic write, so
    /// no reader sees the new character without the status change).
    ///
    /// Accumulation proceeds in every status, including `Intruder`,
    /// `Failed` and `Unlocked`; authorization states gate the display,
    /// not the input.
    pub fn append_key(&self, key: char) {
        let mut rec = self.lock();
        rec.buffer.push(key);
        if rec.status != LockStatus::ResetPassword {
            rec.status = LockStatus::KeyPressed;
        }
    }

    pub fn clear_buffer(&self) {
        self.lock().buffer.clear();
    }

    /// Reset-button press: arm store mode, clear the buffer, force
    /// `ResetPassword`, and invalidate any in-flight entry.
    pub fn begin_reset(&self) {
        let mut rec = self.lock();
        Self::apply_reset(&mut rec);
    }

    fn apply_reset(rec: &mut LockRecord) {
        rec.status = LockStatus::ResetPassword;
        rec.buffer.clear();
        rec.store_mode = true;
        rec.reset_generation += 1;
    }

    /// Terminator press: atomically remove the accumulated buffer and
    /// the store-mode flag. The returned entry is evaluated outside the
    /// lock (hashing is slow) and committed with
    /// [`complete_entry`](Self::complete_entry).
    pub fn take_entry(&self) -> PendingEntry {
        let mut rec = self.lock();
        let password = Zeroizing::new(std::mem::take(&mut rec.buffer));
        let mode = if rec.store_mode {
            EntryMode::Store
        } else {
            EntryMode::Verify
        };
        rec.store_mode = false;
        PendingEntry {
            password,
            mode,
            generation: rec.reset_generation,
        }
    }

    /// Commit the outcome of an evaluated entry.
    ///
    /// Returns `false` without touching the record if the reset button
    /// fired after the entry was taken; the fresher `ResetPassword`
    /// state wins and the stale outcome is dropped.
    pub fn complete_entry(&self, entry: &PendingEntry, outcome: EntryOutcome) -> bool {
        let mut rec = self.lock();
        if rec.reset_generation != entry.generation {
            return false;
        }
        rec.status = match outcome {
            EntryOutcome::Unlocked => LockStatus::Unlocked,
            EntryOutcome::Failed => LockStatus::Failed,
            EntryOutcome::Stored | EntryOutcome::StoreRejected => LockStatus::Locked,
        };
        true
    }
}

impl Default for SharedLockState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_locked_and_empty() {
        let state = SharedLockState::new();
        let snap = state.snapshot();
        assert_eq!(snap.status, LockStatus::Locked);
        assert!(snap.buffer.is_empty());
        assert!(!snap.store_mode);
    }

    #[test]
    fn test_append_flags_keypress() {
        let state = SharedLockState::new();
        state.append_key('1');
        let snap = state.snapshot();
        assert_eq!(snap.status, LockStatus::KeyPressed);
        assert_eq!(snap.buffer, "1");
    }

    #[test]
    fn test_append_during_reset_keeps_status() {
        let state = SharedLockState::new();
        state.begin_reset();
        state.append_key('5');
        let snap = state.snapshot();
        assert_eq!(snap.status, LockStatus::ResetPassword);
        assert_eq!(snap.buffer, "5");
        assert!(snap.store_mode);
    }

    #[test]
    fn test_append_during_intruder_still_accumulates() {
        let state = SharedLockState::new();
        state.transition(LockStatus::Intruder);
        state.append_key('9');
        assert_eq!(state.snapshot().buffer, "9");
    }

    #[test]
    fn test_transition_to_reset_carries_side_effects() {
        let state = SharedLockState::new();
        state.append_key('1');
        state.transition(LockStatus::ResetPassword);
        let snap = state.snapshot();
        assert_eq!(snap.status, LockStatus::ResetPassword);
        assert!(snap.buffer.is_empty());
        assert!(snap.store_mode);
    }

    #[test]
    fn test_transition_from_requires_expected_status() {
        let state = SharedLockState::new();
        assert!(!state.transition_from(LockStatus::Intruder, LockStatus::Default));
        assert_eq!(state.status(), LockStatus::Locked);

        state.transition(LockStatus::Intruder);
        assert!(state.transition_from(LockStatus::Intruder, LockStatus::Default));
        assert_eq!(state.status(), LockStatus::Default);
    }

    #[test]
    fn test_transition_unless_spares_excluded_status() {
        let state = SharedLockState::new();
        state.transition(LockStatus::Unlocked);
        assert!(state
            .transition_unless(LockStatus::Unlocked, LockStatus::Intruder)
            .is_none());
        assert_eq!(state.status(), LockStatus::Unlocked);

        state.transition(LockStatus::Default);
        assert_eq!(
            state.transition_unless(LockStatus::Unlocked, LockStatus::Intruder),
            Some(LockStatus::Default)
        );
        assert_eq!(state.status(), LockStatus::Intruder);
    }

    #[test]
    fn test_take_entry_clears_buffer_and_mode() {
        let state = SharedLockState::new();
        state.begin_reset();
        state.append_key('5');
        state.append_key('5');

        let entry = state.take_entry();
        assert_eq!(entry.password.as_str(), "55");
        assert_eq!(entry.mode, EntryMode::Store);

        let snap = state.snapshot();
        assert!(snap.buffer.is_empty());
        assert!(!snap.store_mode);
    }

    #[test]
    fn test_empty_terminator_yields_empty_entry() {
        let state = SharedLockState::new();
        let entry = state.take_entry();
        assert_eq!(entry.password.as_str(), "");
        assert_eq!(entry.mode, EntryMode::Verify);
    }

    #[test]
    fn test_complete_entry_commits() {
        let state = SharedLockState::new();
        state.append_key('1');
        let entry = state.take_entry();
        assert!(state.complete_entry(&entry, EntryOutcome::Unlocked));
        assert_eq!(state.status(), LockStatus::Unlocked);
    }

    #[test]
    fn test_reset_supersedes_in_flight_entry() {
        let state = SharedLockState::new();
        state.append_key('1');
        let entry = state.take_entry();

        // Reset button fires while the hash is in flight
        state.begin_reset();

        assert!(!state.complete_entry(&entry, EntryOutcome::Unlocked));
        assert_eq!(state.status(), LockStatus::ResetPassword);
        assert!(state.snapshot().store_mode);
    }

    #[test]
    fn test_unlock_replaces_intruder() {
        let state = SharedLockState::new();
        state.append_key('1');
        let entry = state.take_entry();
        state.transition(LockStatus::Intruder);

        assert!(state.complete_entry(&entry, EntryOutcome::Unlocked));
        assert_eq!(state.status(), LockStatus::Unlocked);
    }

    #[test]
    fn test_snapshots_never_torn_under_contention() {
        let state = SharedLockState::new();
        let writer = {
            let state = state.clone();
            std::thread::spawn(move || {
                for i in 0..2_000u32 {
                    match i % 4 {
                        0 => state.append_key('7'),
                        1 => state.begin_reset(),
                        2 => {
                            let entry = state.take_entry();
                            state.complete_entry(&entry, EntryOutcome::Failed);
                        }
                        _ => state.transition(LockStatus::Default),
                    }
                }
            })
        };

        for _ in 0..2_000 {
            let snap = state.snapshot();
            // Store mode is armed only by a reset, which also forces
            // ResetPassword; a later append keeps that status. Any
            // snapshot claiming store mode outside those statuses, or a
            // non-empty buffer in a just-reset state, would be torn.
            if snap.store_mode {
                assert!(
                    snap.status == LockStatus::ResetPassword,
                    "torn snapshot: store_mode set in {:?}",
                    snap.status
                );
            }
        }

        writer.join().unwrap();
    }
}
