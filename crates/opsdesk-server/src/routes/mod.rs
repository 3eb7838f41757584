pub mod attachments;
pub mod clients;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod tasks;
pub mod time_entries;

use std::sync::Arc;

use axum::{http::StatusCode, middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use opsdesk_db::Db;
use opsdesk_service::{LocalService, ServiceError};
use opsdesk_store::ObjectStore;

use crate::auth::{auth_middleware, AuthConfig};

pub struct InnerAppState {
    pub service: LocalService,
    pub db: Db,
    pub auth: Option<Arc<AuthConfig>>,
    pub store: Arc<dyn ObjectStore>,
}

pub type AppState = Arc<InnerAppState>;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new().merge(health::routes());

    let protected = Router::new()
        .merge(clients::routes())
        .merge(projects::routes())
        .merge(tasks::routes())
        .merge(time_entries::routes())
        .merge(attachments::routes())
        .merge(notifications::routes())
        .merge(reports::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    public
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn to_error(e: ServiceError) -> (StatusCode, Json<Value>) {
    let (status, msg) = match &e {
        ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        ServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": msg })))
}
