use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post},
    Router,
};
use chousei_core::ChouseiConfig;
use chousei_schedules::ScheduleStore;
use chousei_users::UserStore;
use chrono_tz::Tz;
use rusqlite::Connection;
use tracing::warn;

use crate::http::{health, respond, schedules};

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ChouseiConfig,
    pub users: UserStore,
    pub schedules: ScheduleStore,
    /// Zone used to render listing timestamps.
    pub tz: Tz,
}

impl AppState {
    /// Build both stores over one shared connection and run their schema
    /// setup. An invalid display zone falls back to the default.
    pub fn new(config: ChouseiConfig, db: Connection) -> chousei_core::Result<Self> {
        let db = Arc::new(Mutex::new(db));
        let schedules = ScheduleStore::new(Arc::clone(&db))?;
        let users = UserStore::new(db)?;
        let tz = config.display.tz().unwrap_or_else(|e| {
            warn!("{e}; using {}", chousei_core::config::DEFAULT_TIMEZONE);
            chrono_tz::Asia::Tokyo
        });
        Ok(Self {
            config,
            users,
            schedules,
            tz,
        })
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/schedules",
            get(schedules::list_schedules).post(schedules::create_schedule),
        )
        .route(
            "/schedules/{schedule_id}",
            get(schedules::show_schedule).post(schedules::modify_schedule),
        )
        .route("/schedules/{schedule_id}/edit", get(schedules::edit_form))
        .route(
            "/schedules/{schedule_id}/users/{user_id}/candidates/{candidate_id}",
            post(respond::set_availability),
        )
        .route(
            "/schedules/{schedule_id}/users/{user_id}/comments",
            post(respond::set_comment),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{self, Body},
        http::{header, Request, StatusCode},
    };
    use chousei_core::config::AuthMode;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn new_router(config: ChouseiConfig) -> Router {
        let db = Connection::open_in_memory().unwrap();
        build_router(Arc::new(AppState::new(config, db).unwrap()))
    }

    fn open_router() -> Router {
        let mut config = ChouseiConfig::default();
        config.gateway.auth.mode = AuthMode::None;
        new_router(config)
    }

    fn request(method: &str, uri: &str, user: (&str, &str), body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-auth-user-id", user.0)
            .header("x-auth-username", user.1);
        match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&v).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const ALICE: (&str, &str) = ("1001", "alice");
    const BOB: (&str, &str) = ("1002", "bob");

    async fn create(app: &Router, candidates: &str) -> String {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/schedules",
                ALICE,
                Some(json!({
                    "schedule_name": "Team lunch",
                    "memo": "",
                    "candidates": candidates,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let body = json_body(response).await;
        let id = body["schedule_id"].as_str().unwrap().to_string();
        assert_eq!(location, format!("/schedules/{id}"));
        id
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = new_router(ChouseiConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], json!("ok"));
    }

    #[tokio::test]
    async fn availability_round_trip_through_view() {
        let app = open_router();
        let id = create(&app, "A\nB\nC").await;

        let view = json_body(
            app.clone()
                .oneshot(request("GET", &format!("/schedules/{id}"), ALICE, None))
                .await
                .unwrap(),
        )
        .await;
        let b = view["candidates"][1]["candidate_id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/schedules/{id}/users/1001/candidates/{b}"),
                ALICE,
                Some(json!({ "availability": 2 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "OK", "availability": 2 })
        );

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/schedules/{id}/users/1001/comments"),
                ALICE,
                Some(json!({ "comment": "testcomment" })),
            ))
            .await
            .unwrap();
        assert_eq!(
            json_body(response).await,
            json!({ "status": "OK", "comment": "testcomment" })
        );

        let view = json_body(
            app.clone()
                .oneshot(request("GET", &format!("/schedules/{id}"), BOB, None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["users"][0]["user_id"], json!("1002"));
        assert_eq!(view["users"][0]["is_self"], json!(true));
        assert_eq!(view["users"][1]["user_id"], json!("1001"));
        assert_eq!(view["attendance"]["1001"][b.to_string()], json!(2));
        assert_eq!(view["attendance"]["1002"][b.to_string()], json!(0));
        assert_eq!(view["comments"]["1001"], json!("testcomment"));
        assert_eq!(view["owner_name"], json!("alice"));
    }

    #[tokio::test]
    async fn out_of_range_availability_is_bad_request() {
        let app = open_router();
        let id = create(&app, "A").await;
        let response = app
            .oneshot(request(
                "POST",
                &format!("/schedules/{id}/users/1001/candidates/1"),
                ALICE,
                Some(json!({ "availability": 7 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_owner_and_missing_get_identical_404() {
        let app = open_router();
        let id = create(&app, "A").await;

        let foreign = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/schedules/{id}?delete=1"),
                BOB,
                None,
            ))
            .await
            .unwrap();
        let missing = app
            .clone()
            .oneshot(request("POST", "/schedules/nope?delete=1", ALICE, None))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(foreign).await, json_body(missing).await);

        let edit = app
            .oneshot(request("GET", &format!("/schedules/{id}/edit"), BOB, None))
            .await
            .unwrap();
        assert_eq!(edit.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owner_edit_then_delete() {
        let app = open_router();
        let id = create(&app, "A").await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/schedules/{id}?edit=1"),
                ALICE,
                Some(json!({ "schedule_name": "Dinner", "memo": "", "candidates": "B" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["schedule_name"], json!("Dinner"));

        let form = json_body(
            app.clone()
                .oneshot(request("GET", &format!("/schedules/{id}/edit"), ALICE, None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(form["candidates"].as_array().unwrap().len(), 2);

        let response = app
            .clone()
            .oneshot(request("POST", &format!("/schedules/{id}?delete=1"), ALICE, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/schedules/{id}"), ALICE, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let list = json_body(
            app.oneshot(request("GET", "/schedules", ALICE, None))
                .await
                .unwrap(),
        )
        .await;
        assert!(list.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_action_is_bad_request() {
        let app = open_router();
        let id = create(&app, "A").await;
        let response = app
            .oneshot(request("POST", &format!("/schedules/{id}?archive=1"), ALICE, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn proxy_token_and_identity_are_required() {
        let mut config = ChouseiConfig::default();
        config.gateway.auth.token = Some("s3cret".to_string());
        let app = new_router(config);

        let no_token = app
            .clone()
            .oneshot(request("GET", "/schedules", ALICE, None))
            .await
            .unwrap();
        assert_eq!(no_token.status(), StatusCode::UNAUTHORIZED);

        let mut with_token = request("GET", "/schedules", ALICE, None);
        with_token
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        let response = app.clone().oneshot(with_token).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let anonymous = Request::builder()
            .uri("/schedules")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
