//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DaemonError, Result};

/// Floor for the credential derivation cost parameter
pub const MIN_HASH_ITERATIONS: u32 = 100_000;

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Username the credential is stored under
    pub username: String,

    /// Path of the credential file store
    pub credential_path: PathBuf,

    /// Distance (sensor units) below which an approach counts as near
    pub near_threshold: f64,

    /// Range sensor sampling cadence (milliseconds)
    pub sample_period_ms: u64,

    /// Display refresh cadence (milliseconds)
    pub display_period_ms: u64,

    /// PBKDF2 iteration count for credential derivation
    pub hash_iterations: u32,

    /// Number of on/off cycles in the failure blink animation
    pub failure_blink_count: u32,

    /// Idle time before a transient display state falls back to Locked
    /// (milliseconds)
    pub idle_timeout_ms: u64,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            username: "warden".to_string(),
            credential_path: Self::default_credential_path(),
            near_threshold: 20.0,
            sample_period_ms: 100,
            display_period_ms: 100,
            hash_iterations: MIN_HASH_ITERATIONS,
            failure_blink_count: 6,
            idle_timeout_ms: 1_000,
        }
    }
}

impl WardenConfig {
    fn default_credential_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("warden")
            .join("credentials.json")
    }

    /// Resolve the config file path from `WARDEN_CONFIG` or the
    /// platform default.
    pub fn default_path() -> PathBuf {
        std::env::var("WARDEN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("/etc"))
                    .join("warden")
                    .join("daemon.json")
            })
    }

    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations that would stall a loop or weaken the
    /// credential scheme.
    pub fn validate(&self) -> Result<()> {
        if self.sample_period_ms == 0 || self.display_period_ms == 0 {
            return Err(DaemonError::Config(
                "sample_period_ms and display_period_ms must be non-zero".to_string(),
            ));
        }
        if self.hash_iterations < MIN_HASH_ITERATIONS {
            return Err(DaemonError::Config(format!(
                "hash_iterations must be at least {}",
                MIN_HASH_ITERATIONS
            )));
        }
        if !(self.near_threshold > 0.0) {
            return Err(DaemonError::Config(
                "near_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn display_period(&self) -> Duration {
        Duration::from_millis(self.display_period_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Create parent directories for the credential store
    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.credential_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Helper module for dirs crate functionality
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }

    pub fn data_local_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        WardenConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_weak_iteration_count() {
        let config = WardenConfig {
            hash_iterations: 1_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_periods() {
        let config = WardenConfig {
            display_period_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.json");

        let config = WardenConfig {
            near_threshold: 35.5,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = WardenConfig::load(&path).unwrap();
        assert_eq!(loaded.near_threshold, 35.5);
        assert_eq!(loaded.failure_blink_count, 6);
    }
}
