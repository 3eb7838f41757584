pub mod auth;
pub mod reminders;
mod routes;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;

use opsdesk_db::Db;
use opsdesk_service::LocalService;
use opsdesk_store::ObjectStore;

use auth::AuthConfig;
use routes::InnerAppState;

pub async fn serve(
    listener: TcpListener,
    db: Db,
    auth: Option<Arc<AuthConfig>>,
    store: Arc<dyn ObjectStore>,
) -> Result<()> {
    let service = LocalService::new(db.clone());
    let state = Arc::new(InnerAppState {
        service,
        db,
        auth,
        store,
    });
    let app = routes::build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
