use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_core::notification::{CreateNotification, NotificationFilter, NotificationKind};
use opsdesk_service::OpsService;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/{id}", axum::routing::delete(delete_notification))
        .route("/api/notifications/{id}/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
struct NotificationQuery {
    #[serde(default)]
    unread_only: bool,
    kind: Option<String>,
    limit: Option<i64>,
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(q): Query<NotificationQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let filter = NotificationFilter {
        unread_only: q.unread_only,
        kind: q.kind.as_deref().and_then(NotificationKind::parse_str),
        limit: q.limit,
    };
    state
        .service
        .list_notifications(&filter)
        .await
        .map(|n| Json(json!(n)))
        .map_err(to_error)
}

async fn unread_count(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .unread_count()
        .await
        .map(|count| Json(json!({ "count": count })))
        .map_err(to_error)
}

async fn create_notification(
    State(state): State<AppState>,
    Json(input): Json<CreateNotification>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    state
        .service
        .create_notification(&input)
        .await
        .map(|n| (StatusCode::CREATED, Json(json!(n))))
        .map_err(to_error)
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .mark_notification_read(&id)
        .await
        .map(|n| Json(json!(n)))
        .map_err(to_error)
}

async fn mark_all_read(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .mark_all_notifications_read()
        .await
        .map(|marked| Json(json!({ "marked": marked })))
        .map_err(to_error)
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state
        .service
        .delete_notification(&id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::test_helpers::test_router;

    #[tokio::test]
    async fn notification_read_flow_over_http() {
        let app = test_router();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/notifications")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"kind":"system","title":"Welcome"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let n: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let id = n["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/notifications/unread-count")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let count: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(count["count"], 1);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/notifications/{id}/read"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/notifications?unread_only=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let unread: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(unread.as_array().unwrap().is_empty());
    }
}
