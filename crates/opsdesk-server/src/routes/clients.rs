use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_core::client::{ClientFilter, ClientSortField, ClientStatus, CreateClient, UpdateClient};
use opsdesk_core::sort::SortDir;
use opsdesk_service::OpsService;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
}

#[derive(Debug, Deserialize)]
struct ClientQuery {
    status: Option<String>,
    search: Option<String>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
    limit: Option<i64>,
}

async fn list_clients(
    State(state): State<AppState>,
    Query(q): Query<ClientQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let filter = ClientFilter {
        status: q.status.as_deref().and_then(ClientStatus::parse_str),
        search: q.search,
        sort_by: q.sort_by.as_deref().and_then(ClientSortField::parse_str),
        sort_dir: q.sort_dir.as_deref().and_then(SortDir::parse_str),
        limit: q.limit,
    };
    state
        .service
        .list_clients(&filter)
        .await
        .map(|c| Json(json!(c)))
        .map_err(to_error)
}

async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .get_client(&id)
        .await
        .map(|c| Json(json!(c)))
        .map_err(to_error)
}

async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClient>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    state
        .service
        .create_client(&input)
        .await
        .map(|c| (StatusCode::CREATED, Json(json!(c))))
        .map_err(to_error)
}

async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateClient>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .update_client(&id, &input)
        .await
        .map(|c| Json(json!(c)))
        .map_err(to_error)
}

async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state
        .service
        .delete_client(&id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(to_error)
}
