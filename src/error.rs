//! Error types for treekv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TreeError
pub type Result<T> = std::result::Result<T, TreeError>;

/// Boxed cause carried by codec failures
pub type CodecError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for treekv operations
#[derive(Debug, Error)]
pub enum TreeError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    /// The key, or the bucket that should hold it, is absent.
    #[error("key not found in database")]
    KeyNotFound,

    /// A key was used as a leaf where it is a bucket, or the other way round.
    #[error("incompatible value: {0}")]
    IncompatibleValue(String),

    /// A stored entry could not be interpreted.
    #[error("corrupt entry: {0}")]
    Corrupt(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("failed to marshal: {0}")]
    Encode(#[source] CodecError),

    #[error("failed to unmarshal {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("transaction not writable")]
    TransactionNotWritable,

    /// A bucket operation ran outside of any transaction.
    #[error("transaction closed")]
    TransactionClosed,

    #[error("database is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("engine error: {0}")]
    Engine(#[from] redb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TreeError {
    /// True for the "nothing stored here yet" outcome callers usually
    /// answer by populating from a fallback source.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::KeyNotFound)
    }
}

macro_rules! engine_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for TreeError {
                fn from(e: $ty) -> Self {
                    TreeError::Engine(redb::Error::from(e))
                }
            }
        )*
    };
}

engine_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
