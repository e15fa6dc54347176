use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::aggregate::AttendanceView;
use crate::error::ScheduleError;

/// An event with candidate slots, owned by its creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub schedule_name: String,
    pub memo: String,
    /// `user_id` of the creator; the only user allowed to edit or delete.
    pub created_by: String,
    /// RFC3339 UTC, microsecond precision so text order is time order.
    pub updated_at: String,
}

impl Schedule {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// One proposed slot. Ids come from a sequence, so id order is the order
/// the owner typed them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: i64,
    pub candidate_name: String,
    pub schedule_id: String,
}

/// A respondent's answer for one candidate. Stored and sent on the wire as
/// its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Attendance {
    /// Code 0. Also what a missing row means.
    #[default]
    Absent,
    /// Code 1.
    Maybe,
    /// Code 2.
    Attending,
}

impl Attendance {
    pub fn code(self) -> i64 {
        match self {
            Attendance::Absent => 0,
            Attendance::Maybe => 1,
            Attendance::Attending => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Attendance::Absent),
            1 => Some(Attendance::Maybe),
            2 => Some(Attendance::Attending),
            _ => None,
        }
    }
}

impl From<Attendance> for i64 {
    fn from(a: Attendance) -> Self {
        a.code()
    }
}

impl TryFrom<i64> for Attendance {
    type Error = ScheduleError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Attendance::from_code(code)
            .ok_or_else(|| ScheduleError::BadRequest(format!("unknown availability code: {code}")))
    }
}

impl ToSql for Attendance {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Attendance {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = i64::column_result(value)?;
        Attendance::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// A stored availability joined with the respondent's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRow {
    pub user_id: String,
    pub username: String,
    pub candidate_id: i64,
    pub availability: Attendance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub user_id: String,
    pub comment: String,
}

/// Body of the create and edit requests. `candidates` is newline-delimited
/// free text; see [`crate::input::parse_candidate_names`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleForm {
    #[serde(default, alias = "scheduleName")]
    pub schedule_name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub candidates: String,
}

/// Home-listing row: a schedule plus its timestamp rendered for display.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    #[serde(flatten)]
    pub schedule: Schedule,
    /// `YYYY/MM/DD HH:mm` in the configured display timezone.
    pub formatted_updated_at: String,
}

/// Everything the owner's edit form needs.
#[derive(Debug, Clone, Serialize)]
pub struct EditForm {
    pub schedule: Schedule,
    pub candidates: Vec<Candidate>,
}

/// The page a viewer sees for one schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    pub schedule: Schedule,
    /// Creator's username as currently stored.
    pub owner_name: String,
    pub candidates: Vec<Candidate>,
    #[serde(flatten)]
    pub attendance: AttendanceView,
}
