use chousei_core::ChouseiError;
use thiserror::Error;

/// Errors raised by the schedule subsystem.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The schedule (or a candidate inside it) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The actor exists but may not perform this mutation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request was malformed, e.g. an out-of-range availability code.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ScheduleError {
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::NotFound(_) => "NOT_FOUND",
            ScheduleError::Forbidden(_) => "FORBIDDEN",
            ScheduleError::BadRequest(_) => "BAD_REQUEST",
            ScheduleError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ScheduleError> for ChouseiError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound(what) => ChouseiError::NotFound { what },
            ScheduleError::Forbidden(reason) => ChouseiError::PermissionDenied { reason },
            ScheduleError::BadRequest(msg) => ChouseiError::BadRequest(msg),
            ScheduleError::Database(e) => ChouseiError::Database(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
