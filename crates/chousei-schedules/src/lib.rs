//! `chousei-schedules`: schedules, their candidate slots, and the
//! availability and comments respondents attach to them.
//!
//! # Overview
//!
//! | Table            | Key                         | Notes                              |
//! |------------------|-----------------------------|------------------------------------|
//! | `schedules`      | `schedule_id` (UUIDv4)      | owned by `created_by`              |
//! | `candidates`     | `candidate_id` (sequence)   | append-only, shown in id order     |
//! | `availabilities` | `(candidate_id, user_id)`   | `schedule_id` kept for scoped delete |
//! | `comments`       | `(schedule_id, user_id)`    | one per respondent                 |
//!
//! [`store::ScheduleStore`] owns every read and write. The attendance matrix
//! shown to a viewer is built by [`aggregate::build_attendance`], a pure
//! function over rows the store has already fetched.

pub mod aggregate;
pub mod db;
pub mod error;
pub mod input;
pub mod store;
pub mod types;

pub use aggregate::{build_attendance, AttendanceUser, AttendanceView};
pub use error::{Result, ScheduleError};
pub use store::ScheduleStore;
pub use types::{
    Attendance, AvailabilityRow, Candidate, CommentRow, EditForm, Schedule, ScheduleForm,
    ScheduleSummary, ScheduleView,
};
