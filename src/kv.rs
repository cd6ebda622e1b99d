//! Persistent key/value store
//!
//! A directory holding one file per key. Values are short strings such as
//! `timestamp_sled` or `identify_slot2`. Writes go through a temporary file
//! followed by a rename, so a concurrent reader never sees a torn value.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Key holding the last known SLED power-off timestamp
pub const KEY_TIMESTAMP_SLED: &str = "timestamp_sled";

/// Key requesting identify blink on every slot
pub const KEY_IDENTIFY_SLED: &str = "identify_sled";

/// Value that turns an identify key on; anything else means off
pub const IDENTIFY_ON: &str = "on";

/// Per-slot identify key (`identify_slot<N>`)
pub fn identify_slot_key(slot: u8) -> String {
    format!("identify_slot{}", slot)
}

/// File-per-key store rooted at a directory
#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    /// Open a store, creating its directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, KvError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(KvError::Io)?;
        tracing::debug!(path = %dir.display(), "Key/value store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a key; a missing key is `Ok(None)`
    pub fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value.trim_end_matches(['\n', '\0']).to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::Io(e)),
        }
    }

    /// Write a key atomically
    pub fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{}.tmp", key));

        let mut file = fs::File::create(&tmp).map_err(KvError::Io)?;
        file.write_all(value.as_bytes()).map_err(KvError::Io)?;
        file.sync_all().map_err(KvError::Io)?;
        fs::rename(&tmp, &path).map_err(KvError::Io)?;

        tracing::trace!(key, value, "Key/value stored");
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

/// Key/value store error type
#[derive(Debug)]
pub enum KvError {
    Io(std::io::Error),
    /// Key is empty or would escape the store directory
    InvalidKey(String),
}

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KvError::Io(e) => write!(f, "I/O error: {}", e),
            KvError::InvalidKey(key) => write!(f, "Invalid key: {:?}", key),
        }
    }
}

impl std::error::Error for KvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KvError::Io(e) => Some(e),
            KvError::InvalidKey(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        assert_eq!(store.get(KEY_TIMESTAMP_SLED).unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();

        store.set(KEY_TIMESTAMP_SLED, "1700000000").unwrap();
        assert_eq!(
            store.get(KEY_TIMESTAMP_SLED).unwrap().as_deref(),
            Some("1700000000")
        );

        // Overwrite leaves no temp file behind
        store.set(KEY_TIMESTAMP_SLED, "1700003600").unwrap();
        assert_eq!(
            store.get(KEY_TIMESTAMP_SLED).unwrap().as_deref(),
            Some("1700003600")
        );
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_trailing_newline_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(KEY_IDENTIFY_SLED), "on\n").unwrap();
        assert_eq!(store.get(KEY_IDENTIFY_SLED).unwrap().as_deref(), Some(IDENTIFY_ON));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        assert!(matches!(store.get(""), Err(KvError::InvalidKey(_))));
        assert!(matches!(store.get("../etc/passwd"), Err(KvError::InvalidKey(_))));
        assert!(matches!(store.set(".hidden", "x"), Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_identify_slot_key() {
        assert_eq!(identify_slot_key(3), "identify_slot3");
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("mnt/data/kv_store");
        let store = KvStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }
}
