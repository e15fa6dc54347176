//! Owner-facing schedule endpoints.
//!
//! `POST /schedules/{id}` carries its action in the query string, the way
//! an HTML form without JavaScript would: `?edit=1` or `?delete=1`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chousei_core::ChouseiError;
use chousei_schedules::{EditForm, ScheduleForm, ScheduleSummary, ScheduleView};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{app::AppState, auth::Viewer, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub edit: Option<String>,
    pub delete: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Edit,
    Delete,
}

impl ActionQuery {
    fn action(&self) -> Option<Action> {
        let set = |flag: &Option<String>| flag.as_deref().and_then(leading_int) == Some(1);
        if set(&self.edit) {
            Some(Action::Edit)
        } else if set(&self.delete) {
            Some(Action::Delete)
        } else {
            None
        }
    }
}

/// Integer prefix of a query value, so `01`, ` 1` and `1.0` all read as 1.
fn leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits = raw[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw.len(), |i| i + sign_len);
    raw[..digits].parse().ok()
}

/// GET /schedules: the caller's own schedules, newest first.
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<ScheduleSummary>>, ApiError> {
    let list = state.schedules.list_for_owner(&viewer.user_id, state.tz)?;
    Ok(Json(list))
}

/// POST /schedules: create a schedule owned by the caller.
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Json(form): Json<ScheduleForm>,
) -> Result<Response, ApiError> {
    let schedule = state.schedules.create(&viewer.user_id, &form)?;
    let location = format!("/schedules/{}", schedule.schedule_id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "schedule_id": schedule.schedule_id })),
    )
        .into_response())
}

/// GET /schedules/{schedule_id}: the backfilled attendance view.
pub async fn show_schedule(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path(schedule_id): Path<String>,
) -> Result<Json<ScheduleView>, ApiError> {
    let view = state.schedules.view(&schedule_id, &viewer)?;
    Ok(Json(view))
}

/// GET /schedules/{schedule_id}/edit: owner only.
pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path(schedule_id): Path<String>,
) -> Result<Json<EditForm>, ApiError> {
    let form = state.schedules.get_for_edit(&schedule_id, &viewer.user_id)?;
    Ok(Json(form))
}

/// POST /schedules/{schedule_id}?edit=1 | ?delete=1: owner only.
///
/// The body is only read for edits; deletes may send nothing at all.
pub async fn modify_schedule(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    Path(schedule_id): Path<String>,
    Query(query): Query<ActionQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    match query.action() {
        Some(Action::Edit) => {
            let form: ScheduleForm = serde_json::from_slice(&body)
                .map_err(|e| ChouseiError::BadRequest(format!("invalid schedule body: {e}")))?;
            let schedule = state
                .schedules
                .update(&schedule_id, &viewer.user_id, &form)?;
            let location = format!("/schedules/{}", schedule.schedule_id);
            Ok(([(header::LOCATION, location)], Json(schedule)).into_response())
        }
        Some(Action::Delete) => {
            state.schedules.delete_owned(&schedule_id, &viewer.user_id)?;
            info!(schedule_id = %schedule_id, user_id = %viewer.user_id, "schedule deleted via http");
            Ok(Json(json!({ "status": "OK" })).into_response())
        }
        None => Err(ChouseiError::BadRequest(
            "expected ?edit=1 or ?delete=1".to_string(),
        )
        .into()),
    }
}
