use std::collections::{BTreeMap, HashMap};

use chousei_users::User;
use serde::Serialize;

use crate::types::{Attendance, AvailabilityRow, Candidate, CommentRow};

/// One row header of the attendance matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceUser {
    pub user_id: String,
    pub username: String,
    /// True only for the viewer.
    pub is_self: bool,
}

/// Fully backfilled attendance for one schedule, as shown to one viewer.
///
/// Every `(user, candidate)` pair from `users × candidates` has an entry in
/// `attendance`, so callers never distinguish "no answer" from "absent".
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttendanceView {
    /// Viewer first, then other respondents by username (ties by user id).
    pub users: Vec<AttendanceUser>,
    /// user_id → candidate_id → answer.
    pub attendance: HashMap<String, BTreeMap<i64, Attendance>>,
    /// user_id → comment, only for users who commented.
    pub comments: HashMap<String, String>,
}

impl AttendanceView {
    /// Answer for one cell, falling back to the default for pairs outside
    /// the matrix.
    pub fn availability(&self, user_id: &str, candidate_id: i64) -> Attendance {
        self.attendance
            .get(user_id)
            .and_then(|row| row.get(&candidate_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn comment(&self, user_id: &str) -> Option<&str> {
        self.comments.get(user_id).map(String::as_str)
    }
}

/// Build the attendance matrix from rows already read for one schedule.
///
/// No I/O happens here. `candidates` should be in display order; the
/// per-user rows are keyed by id so their order does not matter.
pub fn build_attendance(
    viewer: &User,
    candidates: &[Candidate],
    availabilities: &[AvailabilityRow],
    comments: &[CommentRow],
) -> AttendanceView {
    let mut others: BTreeMap<(&str, &str), AttendanceUser> = BTreeMap::new();
    let mut stored: HashMap<&str, HashMap<i64, Attendance>> = HashMap::new();

    for a in availabilities {
        stored
            .entry(a.user_id.as_str())
            .or_default()
            .insert(a.candidate_id, a.availability);

        if a.user_id != viewer.user_id {
            others
                .entry((a.username.as_str(), a.user_id.as_str()))
                .or_insert_with(|| AttendanceUser {
                    user_id: a.user_id.clone(),
                    username: a.username.clone(),
                    is_self: false,
                });
        }
    }

    let mut users = Vec::with_capacity(others.len() + 1);
    users.push(AttendanceUser {
        user_id: viewer.user_id.clone(),
        username: viewer.username.clone(),
        is_self: true,
    });
    users.extend(others.into_values());

    let attendance = users
        .iter()
        .map(|u| {
            let answers = stored.get(u.user_id.as_str());
            let row = candidates
                .iter()
                .map(|c| {
                    let value = answers
                        .and_then(|m| m.get(&c.candidate_id))
                        .copied()
                        .unwrap_or_default();
                    (c.candidate_id, value)
                })
                .collect();
            (u.user_id.clone(), row)
        })
        .collect();

    let comments = comments
        .iter()
        .map(|c| (c.user_id.clone(), c.comment.clone()))
        .collect();

    AttendanceView {
        users,
        attendance,
        comments,
    }
}
