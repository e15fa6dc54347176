use rusqlite::{Connection, Result};

use crate::types::User;

/// Map a `SELECT user_id, username` row to a User.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
    })
}

/// Initialise the users table. Safe to call on every startup (idempotent).
///
/// Must run before `chousei_schedules::db::init_db`, whose tables reference
/// `users(user_id)`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id     TEXT PRIMARY KEY NOT NULL,
            username    TEXT NOT NULL
        );",
    )
}
