use rusqlite::Connection;

use crate::error::Result;

/// Initialise the schedule schema in `conn`.
///
/// Relationships are declared here as foreign keys rather than wired up at
/// runtime. `users` must already exist; [`crate::ScheduleStore::new`]
/// creates it first.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedules (
            schedule_id     TEXT NOT NULL PRIMARY KEY,
            schedule_name   TEXT NOT NULL,
            memo            TEXT NOT NULL,
            created_by      TEXT NOT NULL REFERENCES users(user_id),
            updated_at      TEXT NOT NULL   -- RFC3339 UTC, fixed width
        );
        CREATE INDEX IF NOT EXISTS idx_schedules_owner
            ON schedules (created_by, updated_at DESC);

        CREATE TABLE IF NOT EXISTS candidates (
            candidate_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            candidate_name  TEXT NOT NULL,
            schedule_id     TEXT NOT NULL REFERENCES schedules(schedule_id)
        );
        CREATE INDEX IF NOT EXISTS idx_candidates_schedule
            ON candidates (schedule_id);

        CREATE TABLE IF NOT EXISTS availabilities (
            candidate_id    INTEGER NOT NULL REFERENCES candidates(candidate_id),
            user_id         TEXT NOT NULL REFERENCES users(user_id),
            availability    INTEGER NOT NULL DEFAULT 0
                            CHECK (availability BETWEEN 0 AND 2),
            schedule_id     TEXT NOT NULL REFERENCES schedules(schedule_id),
            PRIMARY KEY (candidate_id, user_id)
        );
        -- Scoped reads and the cascade delete filter on schedule_id only.
        CREATE INDEX IF NOT EXISTS idx_availabilities_schedule
            ON availabilities (schedule_id);

        CREATE TABLE IF NOT EXISTS comments (
            schedule_id     TEXT NOT NULL REFERENCES schedules(schedule_id),
            user_id         TEXT NOT NULL REFERENCES users(user_id),
            comment         TEXT NOT NULL,
            PRIMARY KEY (schedule_id, user_id)
        );
        ",
    )?;
    Ok(())
}
