use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_core::project::{
    CreateProject, ProjectFilter, ProjectSortField, ProjectStatus, UpdateProject,
};
use opsdesk_core::sort::SortDir;
use opsdesk_service::OpsService;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
}

#[derive(Debug, Deserialize)]
struct ProjectQuery {
    client_id: Option<String>,
    status: Option<String>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
    limit: Option<i64>,
}

async fn list_projects(
    State(state): State<AppState>,
    Query(q): Query<ProjectQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let filter = ProjectFilter {
        client_id: q.client_id,
        status: q.status.as_deref().and_then(ProjectStatus::parse_str),
        search: q.search,
        sort_by: q.sort_by.as_deref().and_then(ProjectSortField::parse_str),
        sort_dir: q.sort_dir.as_deref().and_then(SortDir::parse_str),
        limit: q.limit,
    };
    state
        .service
        .list_projects(&filter)
        .await
        .map(|p| Json(json!(p)))
        .map_err(to_error)
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .get_project(&id)
        .await
        .map(|p| Json(json!(p)))
        .map_err(to_error)
}

async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    state
        .service
        .create_project(&input)
        .await
        .map(|p| (StatusCode::CREATED, Json(json!(p))))
        .map_err(to_error)
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProject>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .update_project(&id, &input)
        .await
        .map(|p| Json(json!(p)))
        .map_err(to_error)
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state
        .service
        .delete_project(&id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}
