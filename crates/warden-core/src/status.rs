//! Authorization status enum

use serde::{Deserialize, Serialize};

/// The externally visible authorization state of the lock.
///
/// Exactly one variant is active at any instant. Transitions are made
/// through [`SharedLockState`](crate::state::SharedLockState); no other
/// component mutates the status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockStatus {
    /// Lock engaged; closed-padlock glyph
    Locked,
    /// A key was just pressed; its glyph is shown for one render tick
    KeyPressed,
    /// Password verified; open-padlock glyph until superseded
    Unlocked,
    /// Password rejected; blinking no-entry glyph, then back to Locked
    Failed,
    /// Range sensor reports a near object while not unlocked
    Intruder,
    /// Reset button pressed; next terminator stores a new password
    ResetPassword,
    /// Transient idle state; falls back to Locked after the idle timeout
    Default,
}

impl LockStatus {
    /// Whether this status is a transient display state rather than a
    /// settled authorization decision.
    pub fn is_transient(&self) -> bool {
        matches!(self, LockStatus::KeyPressed | LockStatus::Default)
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LockStatus::Locked => "Locked",
            LockStatus::KeyPressed => "KeyPressed",
            LockStatus::Unlocked => "Unlocked",
            LockStatus::Failed => "Failed",
            LockStatus::Intruder => "Intruder",
            LockStatus::ResetPassword => "ResetPassword",
            LockStatus::Default => "Default",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        assert!(LockStatus::KeyPressed.is_transient());
        assert!(LockStatus::Default.is_transient());
        assert!(!LockStatus::Locked.is_transient());
        assert!(!LockStatus::Intruder.is_transient());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(LockStatus::ResetPassword.to_string(), "ResetPassword");
        assert_eq!(LockStatus::Unlocked.to_string(), "Unlocked");
    }
}
