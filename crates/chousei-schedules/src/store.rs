use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chousei_core::ScheduleId;
use chousei_users::User;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument, warn};

use crate::{
    aggregate::build_attendance,
    db::init_db,
    error::{Result, ScheduleError},
    input::{normalize_comment, normalize_schedule_name, parse_candidate_names},
    types::{
        Attendance, AvailabilityRow, Candidate, CommentRow, EditForm, Schedule, ScheduleForm,
        ScheduleSummary, ScheduleView,
    },
};

const SCHEDULE_COLUMNS: &str = "schedule_id, schedule_name, memo, created_by, updated_at";

/// Owns every read and write of schedules and their dependent rows.
///
/// Shares one connection with [`chousei_users::UserStore`]; the lock is held
/// for the whole of each operation so multi-statement work is never
/// interleaved with another request's.
pub struct ScheduleStore {
    db: Arc<Mutex<Connection>>,
}

impl ScheduleStore {
    /// Enable foreign keys and create the users and schedule tables.
    pub fn new(db: Arc<Mutex<Connection>>) -> Result<Self> {
        {
            let conn = db.lock().unwrap_or_else(PoisonError::into_inner);
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            chousei_users::db::init_db(&conn)?;
            init_db(&conn)?;
        }
        Ok(Self { db })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── creation / edit ──────────────────────────────────────────────────────

    /// Create a schedule and its initial candidates in one transaction.
    #[instrument(skip(self, form))]
    pub fn create(&self, owner_id: &str, form: &ScheduleForm) -> Result<Schedule> {
        let schedule = Schedule {
            schedule_id: ScheduleId::new().to_string(),
            schedule_name: normalize_schedule_name(&form.schedule_name),
            memo: form.memo.clone(),
            created_by: owner_id.to_string(),
            updated_at: now_string(),
        };
        let names = parse_candidate_names(&form.candidates);

        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO schedules (schedule_id, schedule_name, memo, created_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                schedule.schedule_id,
                schedule.schedule_name,
                schedule.memo,
                schedule.created_by,
                schedule.updated_at,
            ],
        )?;
        insert_candidates(&tx, &schedule.schedule_id, &names)?;
        tx.commit()?;

        info!(
            schedule_id = %schedule.schedule_id,
            candidates = names.len(),
            "schedule created"
        );
        Ok(schedule)
    }

    /// Replace name and memo, and append any new candidate lines. Existing
    /// candidates are never touched, so the candidate set only grows.
    #[instrument(skip(self, form))]
    pub fn update(&self, schedule_id: &str, actor_id: &str, form: &ScheduleForm) -> Result<Schedule> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let mut schedule = require_owned(&tx, schedule_id, actor_id)?;

        schedule.schedule_name = normalize_schedule_name(&form.schedule_name);
        schedule.memo = form.memo.clone();
        schedule.updated_at = now_string();
        tx.execute(
            "UPDATE schedules SET schedule_name = ?2, memo = ?3, updated_at = ?4
             WHERE schedule_id = ?1",
            params![
                schedule.schedule_id,
                schedule.schedule_name,
                schedule.memo,
                schedule.updated_at,
            ],
        )?;

        let names = parse_candidate_names(&form.candidates);
        insert_candidates(&tx, schedule_id, &names)?;
        tx.commit()?;

        info!(schedule_id, appended = names.len(), "schedule updated");
        Ok(schedule)
    }

    // ── reads ────────────────────────────────────────────────────────────────

    pub fn get(&self, schedule_id: &str) -> Result<Option<Schedule>> {
        let db = self.conn();
        Ok(find_schedule(&db, schedule_id)?)
    }

    pub fn candidates(&self, schedule_id: &str) -> Result<Vec<Candidate>> {
        let db = self.conn();
        Ok(load_candidates(&db, schedule_id)?)
    }

    /// The owner's schedules, most recently updated first.
    #[instrument(skip(self, tz))]
    pub fn list_for_owner(&self, owner_id: &str, tz: Tz) -> Result<Vec<ScheduleSummary>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules
             WHERE created_by = ?1
             ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let schedules = stmt
            .query_map(params![owner_id], row_to_schedule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(owner_id, count = schedules.len(), "listed schedules");
        Ok(schedules
            .into_iter()
            .map(|schedule| {
                let formatted_updated_at = format_for_display(&schedule.updated_at, tz);
                ScheduleSummary {
                    schedule,
                    formatted_updated_at,
                }
            })
            .collect())
    }

    /// Everything a viewer sees for one schedule, with the attendance matrix
    /// fully backfilled.
    #[instrument(skip(self, viewer), fields(viewer = %viewer.user_id))]
    pub fn view(&self, schedule_id: &str, viewer: &User) -> Result<ScheduleView> {
        let (schedule, owner_name, candidates, availabilities, comments) = {
            let db = self.conn();
            let schedule = find_schedule(&db, schedule_id)?
                .ok_or_else(|| not_found(schedule_id))?;
            let owner_name: String = db.query_row(
                "SELECT username FROM users WHERE user_id = ?1",
                params![schedule.created_by],
                |row| row.get(0),
            )?;
            let candidates = load_candidates(&db, schedule_id)?;
            let availabilities = load_availabilities(&db, schedule_id)?;
            let comments = load_comments(&db, schedule_id)?;
            (schedule, owner_name, candidates, availabilities, comments)
        };

        let attendance = build_attendance(viewer, &candidates, &availabilities, &comments);
        debug!(
            schedule_id,
            users = attendance.users.len(),
            candidates = candidates.len(),
            "built attendance view"
        );
        Ok(ScheduleView {
            schedule,
            owner_name,
            candidates,
            attendance,
        })
    }

    /// Owner-only: the schedule and its candidates for the edit form.
    pub fn get_for_edit(&self, schedule_id: &str, actor_id: &str) -> Result<EditForm> {
        let db = self.conn();
        let schedule = require_owned(&db, schedule_id, actor_id)?;
        let candidates = load_candidates(&db, schedule_id)?;
        Ok(EditForm {
            schedule,
            candidates,
        })
    }

    // ── respondent writes ────────────────────────────────────────────────────

    /// Record `user_id`'s answer for one candidate. Respondents may only
    /// answer for themselves, and the candidate must belong to the schedule.
    #[instrument(skip(self))]
    pub fn set_availability(
        &self,
        schedule_id: &str,
        actor_id: &str,
        user_id: &str,
        candidate_id: i64,
        availability: Attendance,
    ) -> Result<Attendance> {
        ensure_self(actor_id, user_id)?;
        let db = self.conn();
        find_schedule(&db, schedule_id)?.ok_or_else(|| not_found(schedule_id))?;

        let belongs = db
            .query_row(
                "SELECT 1 FROM candidates WHERE candidate_id = ?1 AND schedule_id = ?2",
                params![candidate_id, schedule_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !belongs {
            return Err(ScheduleError::NotFound(format!(
                "candidate {candidate_id} in schedule {schedule_id}"
            )));
        }

        db.execute(
            "INSERT INTO availabilities (candidate_id, user_id, availability, schedule_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(candidate_id, user_id) DO UPDATE SET availability = excluded.availability",
            params![candidate_id, user_id, availability, schedule_id],
        )?;
        info!(schedule_id, user_id, candidate_id, code = availability.code(), "availability set");
        Ok(availability)
    }

    /// Record `user_id`'s comment, replacing any previous one. Returns the
    /// stored (possibly truncated) text.
    #[instrument(skip(self, comment))]
    pub fn set_comment(
        &self,
        schedule_id: &str,
        actor_id: &str,
        user_id: &str,
        comment: &str,
    ) -> Result<String> {
        ensure_self(actor_id, user_id)?;
        let comment = normalize_comment(comment);
        let db = self.conn();
        find_schedule(&db, schedule_id)?.ok_or_else(|| not_found(schedule_id))?;

        db.execute(
            "INSERT INTO comments (schedule_id, user_id, comment) VALUES (?1, ?2, ?3)
             ON CONFLICT(schedule_id, user_id) DO UPDATE SET comment = excluded.comment",
            params![schedule_id, user_id, comment],
        )?;
        info!(schedule_id, user_id, chars = comment.chars().count(), "comment set");
        Ok(comment)
    }

    // ── cascade delete ───────────────────────────────────────────────────────

    /// Owner-checked delete. Missing and foreign schedules are reported as
    /// NotFound and Forbidden respectively; callers must not tell them apart
    /// to the outside.
    pub fn delete_owned(&self, schedule_id: &str, actor_id: &str) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        require_owned(&tx, schedule_id, actor_id)?;
        delete_rows(&tx, schedule_id)?;
        tx.commit()?;
        Ok(())
    }

    /// Remove a schedule with its comments, availabilities and candidates.
    ///
    /// All four deletes run in one transaction: the dependents go first and
    /// the schedule row last, and any failure rolls back the whole cascade.
    /// Ownership is the caller's concern; see [`Self::delete_owned`].
    pub fn delete_aggregate(&self, schedule_id: &str) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        delete_rows(&tx, schedule_id)?;
        tx.commit()?;
        Ok(())
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn delete_rows(conn: &Connection, schedule_id: &str) -> Result<()> {
    // Availabilities reference candidates, so they must go before them.
    let comments = conn.execute(
        "DELETE FROM comments WHERE schedule_id = ?1",
        params![schedule_id],
    )?;
    let availabilities = conn.execute(
        "DELETE FROM availabilities WHERE schedule_id = ?1",
        params![schedule_id],
    )?;
    let candidates = conn.execute(
        "DELETE FROM candidates WHERE schedule_id = ?1",
        params![schedule_id],
    )?;
    let schedules = conn.execute(
        "DELETE FROM schedules WHERE schedule_id = ?1",
        params![schedule_id],
    )?;
    if schedules == 0 {
        warn!(schedule_id, "delete requested for unknown schedule");
        return Err(not_found(schedule_id));
    }
    info!(
        schedule_id,
        comments, availabilities, candidates, "schedule deleted with dependents"
    );
    Ok(())
}

fn insert_candidates(conn: &Connection, schedule_id: &str, names: &[String]) -> Result<()> {
    let mut stmt =
        conn.prepare("INSERT INTO candidates (candidate_name, schedule_id) VALUES (?1, ?2)")?;
    for name in names {
        stmt.execute(params![name, schedule_id])?;
    }
    Ok(())
}

fn find_schedule(conn: &Connection, schedule_id: &str) -> rusqlite::Result<Option<Schedule>> {
    conn.query_row(
        &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE schedule_id = ?1"),
        params![schedule_id],
        row_to_schedule,
    )
    .optional()
}

/// Load the schedule and check `actor_id` created it.
fn require_owned(conn: &Connection, schedule_id: &str, actor_id: &str) -> Result<Schedule> {
    let schedule = find_schedule(conn, schedule_id)?.ok_or_else(|| not_found(schedule_id))?;
    if !schedule.is_owned_by(actor_id) {
        warn!(schedule_id, actor_id, "mutation by non-owner rejected");
        return Err(ScheduleError::Forbidden(format!(
            "user {actor_id} does not own schedule {schedule_id}"
        )));
    }
    Ok(schedule)
}

fn ensure_self(actor_id: &str, user_id: &str) -> Result<()> {
    if actor_id == user_id {
        Ok(())
    } else {
        Err(ScheduleError::Forbidden(format!(
            "user {actor_id} cannot answer for user {user_id}"
        )))
    }
}

fn load_candidates(conn: &Connection, schedule_id: &str) -> rusqlite::Result<Vec<Candidate>> {
    let mut stmt = conn.prepare(
        "SELECT candidate_id, candidate_name, schedule_id FROM candidates
         WHERE schedule_id = ?1
         ORDER BY candidate_id ASC",
    )?;
    let rows = stmt.query_map(params![schedule_id], |row| {
        Ok(Candidate {
            candidate_id: row.get(0)?,
            candidate_name: row.get(1)?,
            schedule_id: row.get(2)?,
        })
    })?;
    rows.collect()
}

fn load_availabilities(
    conn: &Connection,
    schedule_id: &str,
) -> rusqlite::Result<Vec<AvailabilityRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.user_id, u.username, a.candidate_id, a.availability
         FROM availabilities a
         JOIN users u ON u.user_id = a.user_id
         WHERE a.schedule_id = ?1
         ORDER BY u.username ASC, a.candidate_id ASC",
    )?;
    let rows = stmt.query_map(params![schedule_id], |row| {
        Ok(AvailabilityRow {
            user_id: row.get(0)?,
            username: row.get(1)?,
            candidate_id: row.get(2)?,
            availability: row.get(3)?,
        })
    })?;
    rows.collect()
}

fn load_comments(conn: &Connection, schedule_id: &str) -> rusqlite::Result<Vec<CommentRow>> {
    let mut stmt = conn.prepare("SELECT user_id, comment FROM comments WHERE schedule_id = ?1")?;
    let rows = stmt.query_map(params![schedule_id], |row| {
        Ok(CommentRow {
            user_id: row.get(0)?,
            comment: row.get(1)?,
        })
    })?;
    rows.collect()
}

fn row_to_schedule(row: &rusqlite::Row<'_>) -> rusqlite::Result<Schedule> {
    Ok(Schedule {
        schedule_id: row.get(0)?,
        schedule_name: row.get(1)?,
        memo: row.get(2)?,
        created_by: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn not_found(schedule_id: &str) -> ScheduleError {
    ScheduleError::NotFound(format!("schedule {schedule_id}"))
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Render a stored timestamp as `YYYY/MM/DD HH:mm` in `tz`. Unparseable
/// values are shown raw rather than failing the whole listing.
fn format_for_display(updated_at: &str, tz: Tz) -> String {
    match DateTime::parse_from_rfc3339(updated_at) {
        Ok(dt) => dt.with_timezone(&tz).format("%Y/%m/%d %H:%M").to_string(),
        Err(e) => {
            warn!(updated_at, error = %e, "unparseable updated_at");
            updated_at.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_time_uses_configured_zone() {
        let tokyo = format_for_display("2024-03-01T15:30:00.000000Z", chrono_tz::Asia::Tokyo);
        assert_eq!(tokyo, "2024/03/02 00:30");

        let utc = format_for_display("2024-03-01T15:30:00.000000Z", chrono_tz::UTC);
        assert_eq!(utc, "2024/03/01 15:30");
    }

    #[test]
    fn stored_timestamps_sort_as_text() {
        let earlier = "2024-03-01T15:30:00.000009Z";
        let later = "2024-03-01T15:30:00.100000Z";
        assert!(earlier < later);
        assert_eq!(now_string().len(), earlier.len());
    }

    #[test]
    fn answering_for_someone_else_is_forbidden() {
        assert!(ensure_self("1", "1").is_ok());
        assert!(matches!(
            ensure_self("1", "2"),
            Err(ScheduleError::Forbidden(_))
        ));
    }
}
