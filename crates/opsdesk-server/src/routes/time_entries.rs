use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_core::sort::SortDir;
use opsdesk_core::time_entry::{
    CreateTimeEntry, StartTimer, TimeEntryFilter, UpdateTimeEntry,
};
use opsdesk_service::OpsService;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/time-entries",
            get(list_entries).post(create_entry),
        )
        .route(
            "/api/time-entries/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/api/timer/start", post(start_timer))
        .route("/api/timer/stop", post(stop_timer))
        .route("/api/timer/active", get(active_timer))
}

#[derive(Debug, Deserialize)]
struct EntryQuery {
    project_id: Option<String>,
    task_id: Option<String>,
    billable: Option<bool>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    running: Option<bool>,
    sort_dir: Option<String>,
    limit: Option<i64>,
}

async fn list_entries(
    State(state): State<AppState>,
    Query(q): Query<EntryQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let filter = TimeEntryFilter {
        project_id: q.project_id,
        task_id: q.task_id,
        billable: q.billable,
        since: q.since,
        until: q.until,
        running: q.running,
        sort_dir: q.sort_dir.as_deref().and_then(SortDir::parse_str),
        limit: q.limit,
    };
    state
        .service
        .list_time_entries(&filter)
        .await
        .map(|e| Json(json!(e)))
        .map_err(to_error)
}

async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .get_time_entry(&id)
        .await
        .map(|e| Json(json!(e)))
        .map_err(to_error)
}

async fn create_entry(
    State(state): State<AppState>,
    Json(input): Json<CreateTimeEntry>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    state
        .service
        .create_time_entry(&input)
        .await
        .map(|e| (StatusCode::CREATED, Json(json!(e))))
        .map_err(to_error)
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTimeEntry>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .update_time_entry(&id, &input)
        .await
        .map(|e| Json(json!(e)))
        .map_err(to_error)
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state
        .service
        .delete_time_entry(&id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}

async fn start_timer(
    State(state): State<AppState>,
    Json(input): Json<StartTimer>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    state
        .service
        .start_timer(&input)
        .await
        .map(|e| (StatusCode::CREATED, Json(json!(e))))
        .map_err(to_error)
}

async fn stop_timer(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .stop_timer()
        .await
        .map(|e| Json(json!(e)))
        .map_err(to_error)
}

async fn active_timer(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .active_timer()
        .await
        .map(|e| Json(json!(e)))
        .map_err(to_error)
}
