use chousei_core::ChouseiError;
use thiserror::Error;

/// User-layer errors. Kept separate from ChouseiError so the gateway can map
/// them without the stores depending on HTTP concerns.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

impl From<UserError> for ChouseiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(id) => ChouseiError::NotFound {
                what: format!("user {id}"),
            },
            UserError::InvalidIdentity(reason) => ChouseiError::AuthFailed(reason),
            UserError::DatabaseError(e) => ChouseiError::Database(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, UserError>;
