//! Error types for chime-store
//!
//! Operations return [`StoreError`]. Opening a store returns [`InitError`],
//! which process bootstrap is expected to treat as fatal.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The two namespaces held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Device key -> device token
    Device,
    /// Group key -> ordered device keys
    Group,
}

impl Namespace {
    /// Table name of this namespace inside the database file
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Device => "device",
            Namespace::Group => "group",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested key does not exist
    #[error("Not found: {namespace} key [{key}]")]
    NotFound { namespace: Namespace, key: String },

    /// Caller input violates a precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transaction could not be established or committed
    #[error("Storage error: {0}")]
    Storage(String),

    /// The store has been closed
    #[error("Storage error: store is closed")]
    Closed,

    /// A shared store was used before it was initialized
    #[error("Storage error: store is not initialized")]
    NotInitialized,

    /// Stored group bytes are not a well-formed membership list
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Group membership could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse error classification for callers that map errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `StoreError::NotFound`
    NotFound,
    /// `StoreError::Validation`
    Validation,
    /// `StoreError::Storage`, `Closed`, `NotInitialized` and `Serialization`
    Storage,
    /// `StoreError::Decoding`
    Decoding,
}

impl StoreError {
    /// Create a NotFound error for a device key
    pub fn device_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: Namespace::Device,
            key: key.into(),
        }
    }

    /// Create a NotFound error for a group key
    pub fn group_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: Namespace::Group,
            key: key.into(),
        }
    }

    /// Create a new Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a new Decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::Decoding(_) => ErrorKind::Decoding,
            StoreError::Storage(_)
            | StoreError::Closed
            | StoreError::NotInitialized
            | StoreError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Key named by a NotFound error
    pub fn missing_key(&self) -> Option<&str> {
        match self {
            StoreError::NotFound { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

/// Convert from postcard Error to StoreError
impl From<postcard::Error> for StoreError {
    fn from(err: postcard::Error) -> Self {
        StoreError::Decoding(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while opening a store
///
/// None of these are recoverable by the store itself.
#[derive(Debug, Error)]
pub enum InitError {
    /// Data directory could not be created or inspected
    #[error("failed to create database storage dir ({path}): {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data directory path exists but is not a directory
    #[error("database storage path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Database file could not be created
    #[error("failed to create database file ({path}): {source}")]
    DatabaseFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// redb refused to open the database file
    #[error("failed to open database ({path}): {message}")]
    Database { path: PathBuf, message: String },

    /// Namespaces could not be created
    #[error("failed to create database namespaces: {0}")]
    Namespace(String),

    /// Configuration could not be parsed
    #[error("invalid store configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_key() {
        let err = StoreError::device_not_found("nonexistent-key");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.missing_key(), Some("nonexistent-key"));
        assert!(err.to_string().contains("nonexistent-key"));
        assert!(err.to_string().contains("device"));
    }

    #[test]
    fn test_group_not_found() {
        let err = StoreError::group_not_found("G_abc");
        assert!(matches!(
            err,
            StoreError::NotFound {
                namespace: Namespace::Group,
                ..
            }
        ));
    }

    #[test]
    fn test_storage_kinds() {
        assert_eq!(StoreError::Closed.kind(), ErrorKind::Storage);
        assert_eq!(StoreError::NotInitialized.kind(), ErrorKind::Storage);
        assert_eq!(StoreError::storage("disk full").kind(), ErrorKind::Storage);
        assert_eq!(
            StoreError::Serialization("too long".to_string()).kind(),
            ErrorKind::Storage
        );
        assert_eq!(StoreError::validation("empty").kind(), ErrorKind::Validation);
        assert_eq!(StoreError::decoding("bad").kind(), ErrorKind::Decoding);
        assert_eq!(StoreError::Closed.missing_key(), None);
    }

    #[test]
    fn test_postcard_error_conversion() {
        let err: StoreError = postcard::Error::DeserializeUnexpectedEnd.into();
        assert!(matches!(err, StoreError::Decoding(_)));
    }

    #[test]
    fn test_init_error_display() {
        let err = InitError::NotADirectory(PathBuf::from("/tmp/file"));
        assert!(err.to_string().contains("/tmp/file"));
    }
}
