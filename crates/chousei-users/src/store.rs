use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

use crate::db::{init_db, row_to_user};
use crate::error::{Result, UserError};
use crate::types::User;

/// Longest username we keep; providers cap theirs well below this.
const MAX_USERNAME_CHARS: usize = 255;

/// Persists the users the identity provider has vouched for.
///
/// Shares its connection with the schedule store so both see the same
/// `users` table, including under an in-memory database.
pub struct UserStore {
    db: Arc<Mutex<Connection>>,
}

impl UserStore {
    /// Wrap a shared connection, creating the `users` table if needed.
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        init_db(&db.lock().unwrap_or_else(PoisonError::into_inner))?;
        Ok(Self { db })
    }

    /// Record a successful login: insert the user, or refresh the username
    /// if the provider reports a new one.
    #[instrument(skip(self))]
    pub fn upsert(&self, user_id: &str, username: &str) -> Result<User> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(UserError::InvalidIdentity("empty user id".to_string()));
        }
        let username: String = username.trim().chars().take(MAX_USERNAME_CHARS).collect();
        if username.is_empty() {
            return Err(UserError::InvalidIdentity(format!(
                "empty username for user {user_id}"
            )));
        }

        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = db.execute(
            "INSERT INTO users (user_id, username) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET username = excluded.username
             WHERE users.username <> excluded.username",
            params![user_id, username],
        )?;
        if changed > 0 {
            info!(user_id, %username, "user upserted");
        } else {
            debug!(user_id, "user unchanged");
        }

        Ok(User {
            user_id: user_id.to_string(),
            username,
        })
    }

    /// Load a user by provider id. Returns None instead of an error when
    /// absent so callers decide whether missing is exceptional.
    pub fn get(&self, user_id: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        match db.query_row(
            "SELECT user_id, username FROM users WHERE user_id = ?1",
            params![user_id],
            row_to_user,
        ) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::DatabaseError(e)),
        }
    }

    /// Like [`get`](Self::get) but treats absence as an error.
    pub fn require(&self, user_id: &str) -> Result<User> {
        self.get(user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }
}
