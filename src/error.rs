//! Error types for the access layer.

use crate::models::EntityKind;
use diesel::result::{ConnectionError, DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Every failure an access-layer operation can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write violated a required, length, or check constraint.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i32 },

    /// The write collides with existing state, such as a duplicate association.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The database could not be opened.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] ConnectionError),

    /// Any other failure reported by the database.
    #[error("store error: {0}")]
    Query(DieselError),
}

/// Coarse classification used by transports to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    StoreUnavailable,
}

/// Status reported by transports when a resource was created.
pub const CREATED: u16 = 201;

impl ErrorKind {
    /// The HTTP-equivalent status code for this kind of failure.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::StoreUnavailable => 503,
        }
    }
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn not_found(entity: EntityKind, id: i32) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Conflict(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Unavailable(_) | StoreError::Query(_) => ErrorKind::StoreUnavailable,
        }
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        if let DieselError::DatabaseError(kind, info) = &err {
            let message = info.message().to_string();
            match kind {
                DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation => {
                    return StoreError::Conflict(message);
                }
                DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                    return StoreError::Validation(message);
                }
                _ => {}
            }
        }

        StoreError::Query(err)
    }
}
