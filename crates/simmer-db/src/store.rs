//! The key-value store abstraction and typed JSON helpers.
//!
//! Components never see files or paths. They hold an `Arc<dyn Store>` and a
//! key, and read or overwrite one complete JSON document per key.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DbError;

/// A durable string-valued key-value store.
///
/// Writes replace the whole value. Implementations must make a write
/// all-or-nothing: a reader never observes a half-written value.
pub trait Store: Send + Sync + core::fmt::Debug {
    /// Read the value stored at `key`, or `None` if the key is absent.
    fn read(&self, key: &str) -> Result<Option<String>, DbError>;

    /// Overwrite the value stored at `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), DbError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), DbError>;
}

/// Read the value at `key` and deserialize it from JSON.
///
/// Returns `Ok(None)` if the key does not exist.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if the stored JSON does not decode,
/// or the store's own error if the read fails.
pub fn load_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>, DbError> {
    let Some(raw) = store.read(key)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw).map_err(|source| DbError::Serialization {
        key: key.to_owned(),
        source,
    })?;
    Ok(Some(value))
}

/// Serialize `value` as pretty-printed JSON and store it at `key`.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if serialization fails, or the
/// store's own error if the write fails.
pub fn save_json<T: Serialize>(store: &dyn Store, key: &str, value: &T) -> Result<(), DbError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| DbError::Serialization {
        key: key.to_owned(),
        source,
    })?;
    store.write(key, &json)?;
    tracing::trace!(key, bytes = json.len(), "Saved record");
    Ok(())
}

/// Check that `key` is usable as a storage name.
///
/// Keys are restricted to ASCII letters, digits, `_`, `-` and `.`, must be
/// non-empty, and must not start with `.`.
pub(crate) fn validate_key(key: &str) -> Result<(), DbError> {
    let well_formed = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(DbError::InvalidKey(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("player_cooking").is_ok());
        assert!(validate_key("energy-v2.bak").is_ok());
    }

    #[test]
    fn rejects_path_like_keys() {
        assert!(validate_key("").is_err());
        assert!(validate_key("../secrets").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(".hidden").is_err());
    }
}
