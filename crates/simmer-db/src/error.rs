//! Error types for the persistence layer.
//!
//! All errors are propagated via [`DbError`], which carries the store key
//! involved so log lines identify which record failed.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Reading, writing, or removing a backing file failed.
    #[error("I/O error on key {key}: {source}")]
    Io {
        /// The store key being accessed.
        key: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error.
    #[error("serialization error on key {key}: {source}")]
    Serialization {
        /// The store key being encoded or decoded.
        key: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The key is not usable as a storage name.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// The store refused the operation (lock poisoned or failure injected).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
