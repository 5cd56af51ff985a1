//! Persistent key-value store for credential state
//!
//! The credential manager owns exactly one store and is the only writer.
//! Values are plain strings; callers encode anything richer (the expiry
//! timestamp is stored as RFC 3339 text).

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Store key of the bearer access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Store key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Store key of the absolute expiry instant
pub const EXPIRATION_DATE_KEY: &str = "expirationDate";

/// All keys making up a persisted credential
pub const CREDENTIAL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRATION_DATE_KEY];

/// Key-value persistence used by the credential manager
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn clear(&self, key: &str) -> Result<()>;

    /// Write several pairs as one unit where the backend supports it
    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        for (key, value) in pairs {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several keys as one unit where the backend supports it
    fn clear_many(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.clear(key)?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| Error::Internal(format!("credential store lock poisoned: {}", e)))
}

/// In-process store, lost at exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        lock(&self.values)?.remove(key);
        Ok(())
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut values = lock(&self.values)?;
        for (key, value) in pairs {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn clear_many(&self, keys: &[&str]) -> Result<()> {
        let mut values = lock(&self.values)?;
        for key in keys {
            values.remove(*key);
        }
        Ok(())
    }
}

/// Write `content` to `path`, readable by the owner only on Unix
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // A leftover file keeps its old mode; tighten it explicitly
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content)?;
    file.sync_all()?;
    Ok(())
}

/// TOML file backed store
///
/// The whole map is rewritten on every mutation through a temporary file
/// and a rename, so a multi-key update is never observed half applied.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<BTreeMap<String, String>>(&content)?
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = values.len(), "Opened credential store");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string(values)?;
        let tmp_path = self.path.with_extension("toml.tmp");
        write_private(&tmp_path, content.as_bytes())?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut values = lock(&self.values)?;
        let mut updated = values.clone();
        apply(&mut updated);
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.mutate(|values| {
            values.remove(key);
        })
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        self.mutate(|values| {
            for (key, value) in pairs {
                values.insert(key.to_string(), value.to_string());
            }
        })
    }

    fn clear_many(&self, keys: &[&str]) -> Result<()> {
        self.mutate(|values| {
            for key in keys {
                values.remove(*key);
            }
        })
    }
}
