//! Credential storage
//!
//! The appliance keeps exactly one username -> encoded-credential pair
//! in an external key-value store. The store is only ever touched from
//! the keypad processor's terminator handling, so latency is
//! unconstrained; the hot loops never see it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{DaemonError, Result};

/// Persistent key-value storage for encoded credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the stored credential for `username`, if any.
    async fn get(&self, username: &str) -> Result<Option<String>>;

    /// Persist `encoded` as the credential for `username`, replacing
    /// any previous value. Must not report success without persisting.
    async fn put(&self, username: &str, encoded: &str) -> Result<()>;
}

/// On-disk store: one JSON object mapping usernames to encoded
/// credentials, written atomically via a temp file.
pub struct FileCredentialStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    credentials: HashMap<String, String>,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_file(&self) -> Result<CredentialFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| DaemonError::StoreUnavailable(format!("corrupt store file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialFile::default()),
            Err(e) => Err(DaemonError::StoreUnavailable(e.to_string())),
        }
    }

    async fn write_file(&self, file: &CredentialFile) -> Result<()> {
        let contents = serde_json::to_string_pretty(file)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DaemonError::StoreUnavailable(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &contents)
            .await
            .map_err(|e| DaemonError::StoreUnavailable(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| DaemonError::StoreUnavailable(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms)
                .await
                .map_err(|e| DaemonError::StoreUnavailable(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, username: &str) -> Result<Option<String>> {
        let file = self.read_file().await?;
        Ok(file.credentials.get(username).cloned())
    }

    async fn put(&self, username: &str, encoded: &str) -> Result<()> {
        let mut file = self.read_file().await?;
        file.credentials
            .insert(username.to_string(), encoded.to_string());
        self.write_file(&file).await
    }
}

/// In-memory store for tests and the simulated rig.
///
/// Can be flipped unavailable to exercise the degradation paths.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: Mutex<bool>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a credential
    pub fn with_credential(username: &str, encoded: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap()
            .insert(username.to_string(), encoded.to_string());
        store
    }

    /// Simulate the backing service going away
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.lock().unwrap() {
            Err(DaemonError::StoreUnavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, username: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.entries.lock().unwrap().get(username).cloned())
    }

    async fn put(&self, username: &str, encoded: &str) -> Result<()> {
        self.check_available()?;
        self.entries
            .lock()
            .unwrap()
            .insert(username.to_string(), encoded.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        assert!(store.get("warden").await.unwrap().is_none());

        store.put("warden", "abc123").await.unwrap();
        assert_eq!(store.get("warden").await.unwrap().as_deref(), Some("abc123"));

        // Replacement, not accumulation
        store.put("warden", "def456").await.unwrap();
        assert_eq!(store.get("warden").await.unwrap().as_deref(), Some("def456"));
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let store = FileCredentialStore::new(path);
        assert!(matches!(
            store.get("warden").await,
            Err(DaemonError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_outage() {
        let store = MemoryCredentialStore::with_credential("warden", "abc");
        store.set_unavailable(true);
        assert!(store.get("warden").await.is_err());
        assert!(store.put("warden", "def").await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.get("warden").await.unwrap().as_deref(), Some("abc"));
    }
}
