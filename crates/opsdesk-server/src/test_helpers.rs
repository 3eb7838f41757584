use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use opsdesk_db::Db;
use opsdesk_service::LocalService;
use opsdesk_store::StoreConfig;

use crate::auth::AuthConfig;
use crate::routes::{build_router, InnerAppState};

fn temp_store() -> Arc<dyn opsdesk_store::ObjectStore> {
    let config = StoreConfig {
        local_data_dir: Some(
            tempfile::tempdir()
                .unwrap()
                .keep()
                .to_string_lossy()
                .to_string(),
        ),
    };
    opsdesk_store::create_store(&config).unwrap()
}

/// Build a test router with in-memory SQLite, temp local store, no auth.
pub fn test_router() -> Router {
    test_router_with_db().0
}

/// Like [`test_router`], but also hands back the database so tests can
/// seed rows directly.
pub fn test_router_with_db() -> (Router, Db) {
    let db = Db::open_in_memory().unwrap();
    let state = Arc::new(InnerAppState {
        service: LocalService::new(db.clone()),
        db: db.clone(),
        auth: None,
        store: temp_store(),
    });
    (build_router(state), db)
}

/// Build a test router with auth enabled, returning (router, api_key).
pub fn test_router_with_auth() -> (Router, String) {
    let db = Db::open_in_memory().unwrap();
    let api_key = crate::auth::generate_api_key();
    let auth = Arc::new(AuthConfig {
        env_key_hash: Some(crate::auth::sha256_hex(&api_key)),
        db: db.clone(),
    });
    let state = Arc::new(InnerAppState {
        service: LocalService::new(db.clone()),
        db,
        auth: Some(auth),
        store: temp_store(),
    });
    (build_router(state), api_key)
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn an axum test server on a random port. Returns the TestServer
/// with the `base_url` (e.g. "http://127.0.0.1:12345").
pub async fn spawn_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let app = test_router();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        _handle: handle,
    }
}
