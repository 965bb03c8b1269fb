//! JSON-file backed store: one `<key>.json` file per key.
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so a process killed mid-write leaves the previous value intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::DbError;
use crate::store::{Store, validate_key};

/// File extension of stored values.
const EXTENSION: &str = "json";

/// Suffix appended to a value's file name while it is being written.
const TEMP_SUFFIX: &str = "tmp";

/// A [`Store`] keeping each key in its own file under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DbError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| DbError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        tracing::debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    /// The directory holding the stored files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidKey`] if `key` is not a valid storage name.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, DbError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    /// Sibling path a write to `key` goes through before the rename.
    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}.{TEMP_SUFFIX}"))
    }
}

impl Store for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, DbError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DbError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DbError> {
        let path = self.path_for(key)?;
        let temp = self.temp_path_for(key);
        let io_err = |source| DbError::Io {
            key: key.to_owned(),
            source,
        };
        fs::write(&temp, value).map_err(io_err)?;
        fs::rename(&temp, &path).map_err(io_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), DbError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DbError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.write("player_energy", "{\"current\":3}").unwrap();
        assert_eq!(
            store.read("player_energy").unwrap().as_deref(),
            Some("{\"current\":3}")
        );
        assert!(temp_dir.path().join("player_energy.json").exists());
    }

    #[test]
    fn read_missing_key_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(store.read("nothing_here").unwrap().is_none());
    }

    #[test]
    fn overwrite_leaves_no_temp_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.write("player_cooking", "first").unwrap();
        store.write("player_cooking", "second").unwrap();

        assert_eq!(store.read("player_cooking").unwrap().as_deref(), Some("second"));
        assert!(!temp_dir.path().join("player_cooking.json.tmp").exists());
    }

    #[test]
    fn delete_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.write("player_cooking", "{}").unwrap();
        store.delete("player_cooking").unwrap();
        store.delete("player_cooking").unwrap();
        assert!(store.read("player_cooking").unwrap().is_none());
    }

    #[test]
    fn open_creates_nested_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("saves").join("slot1");
        let store = FileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn dotted_keys_keep_separate_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();

        store.write("save.v1", "one").unwrap();
        store.write("save.v2", "two").unwrap();
        store.write("save", "plain").unwrap();

        assert_eq!(store.read("save.v1").unwrap().as_deref(), Some("one"));
        assert_eq!(store.read("save.v2").unwrap().as_deref(), Some("two"));
        assert_eq!(store.read("save").unwrap().as_deref(), Some("plain"));
        assert!(temp_dir.path().join("save.v1.json").exists());
        assert!(temp_dir.path().join("save.v2.json").exists());

        store.delete("save.v1").unwrap();
        assert!(store.read("save.v1").unwrap().is_none());
        assert_eq!(store.read("save.v2").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn invalid_key_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        assert!(matches!(
            store.write("../escape", "x"),
            Err(DbError::InvalidKey(_))
        ));
    }
}
