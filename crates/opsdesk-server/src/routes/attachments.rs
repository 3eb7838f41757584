use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use opsdesk_core::attachment::{AttachmentOwner, CreateAttachment};
use opsdesk_service::{OpsService, ServiceError};
use opsdesk_store::attachment_key;

use super::{to_error, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/{owner}/{owner_id}/attachments",
            get(list_attachments).post(upload_attachment),
        )
        .route(
            "/api/attachments/{id}",
            get(get_attachment).delete(delete_attachment),
        )
        .route("/api/attachments/{id}/download", get(download_attachment))
}

fn parse_owner(plural: &str) -> Result<AttachmentOwner, (StatusCode, Json<Value>)> {
    match plural {
        "clients" => Ok(AttachmentOwner::Client),
        "projects" => Ok(AttachmentOwner::Project),
        "tasks" => Ok(AttachmentOwner::Task),
        other => Err(to_error(ServiceError::NotFound(format!(
            "unknown attachment owner: {other}"
        )))),
    }
}

async fn list_attachments(
    State(state): State<AppState>,
    Path((owner, owner_id)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let owner = parse_owner(&owner)?;
    state
        .service
        .list_attachments(owner, &owner_id)
        .await
        .map(|a| Json(json!(a)))
        .map_err(to_error)
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
}

async fn upload_attachment(
    State(state): State<AppState>,
    Path((owner, owner_id)): Path<(String, String)>,
    Query(q): Query<UploadQuery>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let owner = parse_owner(&owner)?;
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let id = uuid::Uuid::new_v4().to_string();
    let key = attachment_key(owner.plural(), &owner_id, &id, &q.filename);
    let input = CreateAttachment {
        owner,
        owner_id,
        filename: q.filename,
        content_type,
        size_bytes: body.len() as i64,
    };

    // Metadata row first so an invalid owner never leaves an orphan blob.
    let attachment = state
        .service
        .create_attachment(&id, &input, &key)
        .map_err(to_error)?;

    if let Err(e) = state.store.put(&key, body).await {
        let _ = state.service.delete_attachment(&attachment.id).await;
        return Err(to_error(ServiceError::Internal(format!(
            "store write: {e}"
        ))));
    }

    Ok((StatusCode::CREATED, Json(json!(attachment))))
}

async fn get_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .service
        .get_attachment(&id)
        .await
        .map(|a| Json(json!(a)))
        .map_err(to_error)
}

async fn download_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let attachment = state.service.get_attachment(&id).await.map_err(to_error)?;
    let bytes = state
        .store
        .get(&attachment.store_key)
        .await
        .map_err(|e| to_error(ServiceError::Internal(format!("store read: {e}"))))?;
    Response::builder()
        .header("Content-Type", attachment.content_type)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", attachment.filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| to_error(ServiceError::Internal(format!("response: {e}"))))
}

async fn delete_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let attachment = state
        .service
        .delete_attachment(&id)
        .await
        .map_err(to_error)?;
    // Blob removal is idempotent; a missing object is not an error.
    let _ = state.store.delete(&attachment.store_key).await;
    Ok(Json(json!(attachment)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::test_helpers::test_router_with_db;

    use opsdesk_core::client::{ClientStatus, CreateClient};

    fn seed_client(db: &opsdesk_db::Db) -> String {
        db.create_client(&CreateClient {
            name: "Acme".into(),
            email: "acme@example.com".into(),
            company: String::new(),
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
            status: ClientStatus::Active,
        })
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn upload_download_delete_roundtrip() {
        let (app, db) = test_router_with_db();
        let client_id = seed_client(&db);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!(
                        "/api/clients/{client_id}/attachments?filename=contract.pdf"
                    ))
                    .header("Content-Type", "application/pdf")
                    .body(Body::from("PDFDATA"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let att: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let att_id = att["id"].as_str().unwrap().to_string();
        assert_eq!(att["size_bytes"], 7);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/attachments/{att_id}/download"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/pdf"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"PDFDATA");

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/attachments/{att_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/attachments/{att_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_to_missing_owner_is_not_found() {
        let (app, _db) = test_router_with_db();
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks/missing/attachments?filename=x.txt")
                    .header("Content-Type", "text/plain")
                    .body(Body::from("hi"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
