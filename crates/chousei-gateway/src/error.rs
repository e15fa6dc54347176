use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chousei_core::ChouseiError;
use serde_json::json;
use tracing::{error, warn};

/// Body shared by "missing" and "not yours" so callers cannot probe for
/// schedules they were never shown.
pub const HIDDEN_RESOURCE_MESSAGE: &str = "schedule not found or not permitted";

/// Handler error: any subsystem error, rendered as a JSON body.
#[derive(Debug)]
pub struct ApiError(pub ChouseiError);

impl<E> From<E> for ApiError
where
    E: Into<ChouseiError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status, message) = if err.is_hidden_resource() {
            warn!(code = err.code(), error = %err, "hidden resource");
            (StatusCode::NOT_FOUND, HIDDEN_RESOURCE_MESSAGE.to_string())
        } else {
            match &err {
                ChouseiError::AuthFailed(reason) => {
                    warn!(reason = %reason, "authentication failed");
                    (StatusCode::UNAUTHORIZED, err.to_string())
                }
                ChouseiError::BadRequest(reason) => {
                    warn!(reason = %reason, "bad request");
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                _ => {
                    error!(code = err.code(), error = %err, "request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_string(),
                    )
                }
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_forbidden_look_the_same() {
        let missing = ApiError(ChouseiError::NotFound {
            what: "schedule abc".into(),
        })
        .into_response();
        let forbidden = ApiError(ChouseiError::PermissionDenied {
            reason: "user 2 does not own schedule abc".into(),
        })
        .into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(forbidden.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn database_details_are_not_leaked() {
        let resp = ApiError(ChouseiError::Database("disk I/O error".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_and_bad_request_statuses() {
        let unauth = ApiError(ChouseiError::AuthFailed("missing identity".into())).into_response();
        assert_eq!(unauth.status(), StatusCode::UNAUTHORIZED);
        let bad = ApiError(ChouseiError::BadRequest("unknown flag".into())).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
