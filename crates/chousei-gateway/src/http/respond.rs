//! Respondent endpoints: per-candidate availability and the free-text
//! comment. Both answer with `{"status":"OK", ...}` echoing what was stored.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chousei_schedules::Attendance;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{app::AppState, auth::Viewer, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    /// Raw code; validated here so out-of-range values are a 400, not a 422.
    pub availability: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub comment: String,
}

/// POST /schedules/{schedule_id}/users/{user_id}/candidates/{candidate_id}
pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path((schedule_id, user_id, candidate_id)): Path<(String, String, i64)>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<Value>, ApiError> {
    let availability = Attendance::try_from(body.availability)?;
    let stored = state.schedules.set_availability(
        &schedule_id,
        &viewer.user_id,
        &user_id,
        candidate_id,
        availability,
    )?;
    Ok(Json(json!({ "status": "OK", "availability": stored })))
}

/// POST /schedules/{schedule_id}/users/{user_id}/comments
pub async fn set_comment(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path((schedule_id, user_id)): Path<(String, String)>,
    Json(body): Json<CommentBody>,
) -> Result<Json<Value>, ApiError> {
    let stored =
        state
            .schedules
            .set_comment(&schedule_id, &viewer.user_id, &user_id, &body.comment)?;
    Ok(Json(json!({ "status": "OK", "comment": stored })))
}
