use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_core::sort::SortDir;
use opsdesk_core::task::{
    CreateTask, Priority, TaskFilter, TaskSortField, TaskStatus, UpdateTask,
};
use opsdesk_service::OpsService;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/count-by-status", get(count_by_status))
}

#[derive(Debug, Deserialize)]
struct TaskQuery {
    project_id: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    due_before: Option<DateTime<Utc>>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
    limit: Option<i64>,
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(q): Query<TaskQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let filter = TaskFilter {
        project_id: q.project_id,
        status: q.status.as_deref().and_then(TaskStatus::parse_str),
        priority: q.priority.as_deref().and_then(Priority::parse_str),
        due_before: q.due_before,
        search: q.search,
        sort_by: q.sort_by.as_deref().and_then(TaskSortField::parse_str),
        sort_dir: q.sort_dir.as_deref().and_then(SortDir::parse_str),
        limit: q.limit,
    };
    state
        .service
        .list_tasks(&filter)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .get_task(&id)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn create_task(
    State(state): State<AppState>,
    Json(input): Json<CreateTask>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    state
        .service
        .create_task(&input)
        .await
        .map(|t| (StatusCode::CREATED, Json(json!(t))))
        .map_err(to_error)
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .update_task(&id, &input)
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state
        .service
        .delete_task(&id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}

#[derive(Debug, Deserialize)]
struct CountQuery {
    project_id: String,
}

async fn count_by_status(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .count_tasks_by_status(&q.project_id)
        .await
        .map(|c| Json(json!(c)))
        .map_err(to_error)
}
