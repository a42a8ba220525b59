//! Warden Core - Lock state model and credential primitives
//!
//! This crate provides the hardware-independent heart of the Warden
//! access-control appliance: the authorization status enum, the
//! mutex-guarded shared lock record that every execution context reads
//! and writes, and the salted iterated-hash credential scheme.

pub mod credential;
pub mod error;
pub mod state;
pub mod status;

pub use credential::Credential;
pub use error::{Error, Result};
pub use state::{EntryMode, EntryOutcome, LockSnapshot, PendingEntry, SharedLockState};
pub use status::LockStatus;

/// Key that terminates password entry and triggers evaluation
pub const TERMINATOR_KEY: char = '#';

/// Default PBKDF2 iteration count for credential derivation
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

/// Salt length in bytes (64 hex chars when encoded)
pub const SALT_LEN: usize = 32;

/// Derived key length in bytes (128 hex chars when encoded)
pub const DERIVED_LEN: usize = 64;
