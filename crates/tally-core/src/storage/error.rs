//! Storage error handling
//!
//! Typed failures of the key-value layer. Each carries the key or path it
//! concerns; a few also carry a hint the CLI can show to the user.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a key-value operation failed
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create storage directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied on '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No space left, or the user's quota is used up
    #[error("Out of disk space writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read '{key}' from '{path}': {source}")]
    ReadError {
        key: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temp file was written but could not replace the old value
    #[error("Cannot move '{from}' into place at '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Key contains nothing usable as a file name
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// Backend refused or could not serve the request
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Cannot encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value is not the expected JSON shape
    #[error("Unreadable value under '{key}': {source}")]
    InvalidFormat {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Wrap a write-side I/O failure on `path`, telling apart permission
    /// and out-of-space problems
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path,
                source: error,
            }
        } else if is_out_of_space(&error) {
            StorageError::DiskFull {
                path,
                source: error,
            }
        } else {
            StorageError::WriteError {
                path,
                source: error,
            }
        }
    }

    /// What the user can do about it, when there is something
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } | StorageError::CreateDirectory { .. } => {
                Some("Check that you can write to the data directory, or point data_dir elsewhere.")
            }
            StorageError::InvalidFormat { .. } => {
                Some("The stored file was not written by tally. Move it aside to start that collection fresh.")
            }
            _ => None,
        }
    }
}

fn is_out_of_space(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, PathBuf::from("/data/users.json"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_out_of_space_classification() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, PathBuf::from("/data/expenses.json"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert_eq!(err.recovery_suggestion(), Some("Free up disk space and try again."));
    }

    #[test]
    fn test_other_io_is_write_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "device went away");
        let err = StorageError::from_io(io_err, PathBuf::from("/data/users.json"));

        assert!(matches!(err, StorageError::WriteError { .. }));
        assert!(err.recovery_suggestion().is_none());
    }

    #[test]
    fn test_invalid_format_names_key() {
        let source = serde_json::from_str::<Vec<u8>>("{not json").unwrap_err();
        let err = StorageError::InvalidFormat {
            key: "@expense_tracker_users".to_string(),
            source,
        };

        assert!(err.to_string().contains("@expense_tracker_users"));
        assert!(err.recovery_suggestion().is_some());
    }
}
