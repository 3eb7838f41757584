use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_service::OpsService;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/dashboard", get(dashboard))
        .route("/api/reports/revenue", get(revenue))
        .route("/api/reports/utilization", get(utilization))
        .route("/api/reports/profitability", get(profitability))
        .route("/api/reports/completion", get(completion))
}

async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .dashboard_summary()
        .await
        .map(|s| Json(json!(s)))
        .map_err(to_error)
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

async fn revenue(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .revenue_report(q.since, q.until)
        .await
        .map(|r| Json(json!(r)))
        .map_err(to_error)
}

async fn utilization(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .utilization_report(q.since, q.until)
        .await
        .map(|r| Json(json!(r)))
        .map_err(to_error)
}

async fn profitability(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .profitability_report()
        .await
        .map(|r| Json(json!(r)))
        .map_err(to_error)
}

async fn completion(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .completion_report()
        .await
        .map(|r| Json(json!(r)))
        .map_err(to_error)
}
