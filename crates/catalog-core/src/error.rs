//! Errors raised by the relational layer and the lookups behind validation.
//!
//! Storage failures have their own type in `catalog-storage`; the write
//! coordinator composes both into `WriteError`. The `Database` variant wraps
//! `sqlx::Error` when the `sqlx` feature is on.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Level an error should be logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes such as rejected input
    Debug,
    Warn,
    /// Unexpected failures
    Error,
}

/// How an error is presented to whatever layer sits in front of the catalog.
pub trait ErrorMetadata {
    /// HTTP status code a transport should answer with
    fn http_status_code(&self) -> u16;

    /// Machine-readable code, e.g. `DATABASE_ERROR`
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    /// Message safe to show to a client
    fn client_message(&self) -> String;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness or foreign-key constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::Database(ref db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                AppError::Conflict(db_err.message().to_string())
            }
            SqlxError::RowNotFound => AppError::NotFound("row".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl AppError {
    /// Whether the store rejected the write because of existing data.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        match self {
            AppError::Database(_) | AppError::Internal(_) => 500,
            AppError::Conflict(_) => 409,
            AppError::NotFound(_) => 404,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Conflict(_) => "CONSTRAINT_VIOLATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        // A conflicting row may be gone on retry; a missing one will not appear.
        !matches!(self, AppError::NotFound(_))
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Conflict(_) => "The write conflicts with existing data".to_string(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::Database(_) | AppError::Internal(_) => LogLevel::Error,
            AppError::Conflict(_) => LogLevel::Warn,
            AppError::NotFound(_) => LogLevel::Debug,
        }
    }
}
