//! Error and response types for the backend client
//!
//! Operations return `Result<T, Error>`. The presentation layer converts
//! these into an [`ApiResponse`], whose error carries a stable code and a
//! message safe to show a user (no storage internals).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::Table;
use crate::storage::{Collection, StorageError};

/// A mutating operation, used to word storage failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SignUp,
    SignIn,
    SignOut,
    UpdateUser,
    Insert(Table),
    Delete(Table),
}

impl Operation {
    /// User-facing text shown when the operation fails for internal reasons
    pub fn failure_message(&self) -> String {
        match self {
            Operation::SignUp => "Failed to create account. Please try again.".to_string(),
            Operation::SignIn => "Failed to log in. Please try again.".to_string(),
            Operation::SignOut => "Failed to sign out".to_string(),
            Operation::UpdateUser => "Failed to update user data".to_string(),
            Operation::Insert(table) => format!("Failed to add {}", table.singular()),
            Operation::Delete(table) => format!("Failed to delete {}", table.singular()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::SignUp => f.write_str("sign up"),
            Operation::SignIn => f.write_str("sign in"),
            Operation::SignOut => f.write_str("sign out"),
            Operation::UpdateUser => f.write_str("update user"),
            Operation::Insert(table) => write!(f, "insert into {}", table),
            Operation::Delete(table) => write!(f, "delete from {}", table),
        }
    }
}

/// Backend client error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No active session")]
    NoActiveSession,

    #[error("User not found")]
    UserNotFound,

    #[error("Field '{0}' cannot be changed through a profile update")]
    ProtectedField(String),

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("This category has {count} expense(s). Delete or reassign them first.")]
    CategoryInUse { category_id: String, count: usize },

    #[error("{op} failed while writing {collection}: {source}")]
    StorageWrite {
        op: Operation,
        collection: Collection,
        #[source]
        source: StorageError,
    },

    #[error("Failed to hash password: {0}")]
    PasswordHash(String),
}

/// Stable, serializable error discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DuplicateEmail,
    InvalidCredentials,
    NoActiveSession,
    UserNotFound,
    ProtectedField,
    Validation,
    CategoryInUse,
    StorageWriteFailure,
    StorageReadFailure,
    Internal,
}

impl Error {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::DuplicateEmail => ErrorCode::DuplicateEmail,
            Error::InvalidCredentials => ErrorCode::InvalidCredentials,
            Error::NoActiveSession => ErrorCode::NoActiveSession,
            Error::UserNotFound => ErrorCode::UserNotFound,
            Error::ProtectedField(_) => ErrorCode::ProtectedField,
            Error::Validation { .. } => ErrorCode::Validation,
            Error::CategoryInUse { .. } => ErrorCode::CategoryInUse,
            Error::StorageWrite { .. } => ErrorCode::StorageWriteFailure,
            Error::PasswordHash(_) => ErrorCode::Internal,
        }
    }

    /// Message safe to show a user
    ///
    /// Storage and hashing failures are reduced to the failing operation's
    /// text; everything else is already user-facing.
    pub fn public_message(&self) -> String {
        match self {
            Error::StorageWrite { op, .. } => op.failure_message(),
            Error::PasswordHash(_) => Operation::SignUp.failure_message(),
            other => other.to_string(),
        }
    }

    /// True for failures caused by the caller's credentials or session
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::DuplicateEmail
                | Error::InvalidCredentials
                | Error::NoActiveSession
                | Error::UserNotFound
        )
    }
}

/// Backend client result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error half of an [`ApiResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&Error> for ApiError {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code(),
            message: error.public_message(),
        }
    }
}

/// Success payload of operations that return nothing, serialized as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

/// `{data, error}` envelope handed to the presentation layer
///
/// Exactly one of `data` and `error` is non-null. Operations returning `()`
/// go through `ApiResponse::<Ack>::from_unit` so their `data` is `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed response
    pub fn fail(error: &Error) -> Self {
        Self {
            data: None,
            error: Some(ApiError::from(error)),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl ApiResponse<Ack> {
    /// Envelope for an operation with no result value
    pub fn from_unit(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(Ack {}),
            Err(e) => Self::fail(&e),
        }
    }
}

impl<T> From<Result<T>> for ApiResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn write_failure(op: Operation) -> Error {
        Error::StorageWrite {
            op,
            collection: Collection::Expenses,
            source: StorageError::DiskFull {
                path: PathBuf::from("/data/expense_tracker_expenses.json"),
                source: io::Error::new(io::ErrorKind::Other, "No space left on device"),
            },
        }
    }

    #[test]
    fn test_storage_failure_hides_internals() {
        let err = write_failure(Operation::Insert(Table::Expenses));

        assert_eq!(err.public_message(), "Failed to add expense");
        assert_eq!(err.code(), ErrorCode::StorageWriteFailure);
        // Internal detail is still available for logs
        assert!(err.to_string().contains("expense_tracker_expenses.json"));
    }

    #[test]
    fn test_table_specific_failure_messages() {
        assert_eq!(
            Operation::Delete(Table::Categories).failure_message(),
            "Failed to delete category"
        );
        assert_eq!(
            Operation::Insert(Table::QuickExpenses).failure_message(),
            "Failed to add quick expense"
        );
    }

    #[test]
    fn test_auth_errors_are_distinguishable() {
        let auth = ApiError::from(&Error::InvalidCredentials);
        let query = ApiError::from(&write_failure(Operation::Insert(Table::Categories)));

        assert_eq!(auth.code, ErrorCode::InvalidCredentials);
        assert_eq!(auth.message, "Invalid email or password");
        assert_ne!(auth.code, query.code);
        assert!(Error::InvalidCredentials.is_auth_error());
    }

    #[test]
    fn test_response_from_result() {
        let ok: Result<i32> = Ok(42);
        let response: ApiResponse<i32> = ok.into();
        assert!(response.is_ok());
        assert_eq!(response.data, Some(42));

        let err: Result<i32> = Err(Error::DuplicateEmail);
        let response: ApiResponse<i32> = err.into();
        assert!(response.data.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, ErrorCode::DuplicateEmail);
    }

    #[test]
    fn test_unit_success_has_non_null_data() {
        let response = ApiResponse::from_unit(Ok(()));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"data": {}, "error": null}));

        let response = ApiResponse::from_unit(Err(Error::NoActiveSession));
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], "no_active_session");
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::NoActiveSession).unwrap();
        assert_eq!(json, "\"no_active_session\"");
    }
}
