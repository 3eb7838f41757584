use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};

use opsdesk_core::attachment::{Attachment, AttachmentOwner};
use opsdesk_core::client::{Client, ClientFilter, CreateClient, UpdateClient};
use opsdesk_core::notification::{CreateNotification, Notification, NotificationFilter};
use opsdesk_core::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use opsdesk_core::report::{
    DashboardSummary, ProjectCompletion, ProjectProfitability, RevenueReport, UtilizationReport,
};
use opsdesk_core::task::{CreateTask, Task, TaskFilter, UpdateTask};
use opsdesk_core::time_entry::{
    CreateTimeEntry, StartTimer, TimeEntry, TimeEntryFilter, UpdateTimeEntry,
};

use crate::{OpsService, ServiceError};

/// Async HTTP client implementation of OpsService.
/// Connects to a running opsdesk-server.
pub struct HttpService {
    base_url: String,
    client: ReqwestClient,
    api_key: Option<String>,
}

// Query-string timestamps avoid the '+00:00' offset form so they survive
// URL parsing without percent-encoding.
fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: ReqwestClient::new(),
            api_key: None,
        }
    }

    pub fn with_api_key(base_url: &str, key: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: ReqwestClient::new(),
            api_key: Some(key),
        }
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Check if the server is reachable.
    /// Health endpoint is NOT authenticated.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::Internal(format!(
                "health check failed: {}",
                resp.status()
            )))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let builder = self.client.get(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn post_empty<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let builder = self.client.post(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .put(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    async fn delete_req(&self, path: &str) -> Result<(), ServiceError> {
        let builder = self.client.delete(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(parse_error(resp).await)
        }
    }

    async fn delete_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let builder = self.client.delete(format!("{}{path}", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    // -- Attachment conveniences (not on trait; blobs are transport-bound) --

    /// Upload raw bytes as an attachment on the given owner.
    pub async fn upload_attachment(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<Attachment, ServiceError> {
        let builder = self
            .client
            .post(format!(
                "{}/api/{}/{owner_id}/attachments?filename={filename}",
                self.base_url,
                owner.plural()
            ))
            .header("Content-Type", content_type.to_string())
            .body(bytes);
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }

    /// Fetch the blob for an attachment.
    pub async fn download_attachment(&self, id: &str) -> Result<Bytes, ServiceError> {
        let builder = self
            .client
            .get(format!("{}/api/attachments/{id}/download", self.base_url));
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if resp.status().is_success() {
            resp.bytes()
                .await
                .map_err(|e| ServiceError::Internal(format!("read body: {e}")))
        } else {
            Err(parse_error(resp).await)
        }
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error(resp: reqwest::Response) -> ServiceError {
    let status = resp.status();
    parse_error_with_status(status, resp).await
}

async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        ServiceError::NotFound(msg)
    } else if status == StatusCode::BAD_REQUEST {
        ServiceError::InvalidInput(msg)
    } else {
        ServiceError::Internal(msg)
    }
}

fn query_string(params: Vec<String>) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

#[async_trait]
impl OpsService for HttpService {
    async fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, ServiceError> {
        let mut params = Vec::new();
        if let Some(status) = filter.status {
            params.push(format!("status={}", status.as_str()));
        }
        if let Some(ref search) = filter.search {
            params.push(format!("search={search}"));
        }
        if let Some(sort_by) = filter.sort_by {
            params.push(format!("sort_by={}", sort_by.as_str()));
        }
        if let Some(dir) = filter.sort_dir {
            params.push(format!("sort_dir={}", dir.as_str()));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={limit}"));
        }
        self.get_json(&format!("/api/clients{}", query_string(params)))
            .await
    }

    async fn get_client(&self, id: &str) -> Result<Client, ServiceError> {
        self.get_json(&format!("/api/clients/{id}")).await
    }

    async fn create_client(&self, input: &CreateClient) -> Result<Client, ServiceError> {
        self.post_json("/api/clients", input).await
    }

    async fn update_client(
        &self,
        id: &str,
        update: &UpdateClient,
    ) -> Result<Client, ServiceError> {
        self.put_json(&format!("/api/clients/{id}"), update).await
    }

    async fn delete_client(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/clients/{id}")).await
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, ServiceError> {
        let mut params = Vec::new();
        if let Some(ref client_id) = filter.client_id {
            params.push(format!("client_id={client_id}"));
        }
        if let Some(status) = filter.status {
            params.push(format!("status={}", status.as_str()));
        }
        if let Some(ref search) = filter.search {
            params.push(format!("search={search}"));
        }
        if let Some(sort_by) = filter.sort_by {
            params.push(format!("sort_by={}", sort_by.as_str()));
        }
        if let Some(dir) = filter.sort_dir {
            params.push(format!("sort_dir={}", dir.as_str()));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={limit}"));
        }
        self.get_json(&format!("/api/projects{}", query_string(params)))
            .await
    }

    async fn get_project(&self, id: &str) -> Result<Project, ServiceError> {
        self.get_json(&format!("/api/projects/{id}")).await
    }

    async fn create_project(&self, input: &CreateProject) -> Result<Project, ServiceError> {
        self.post_json("/api/projects", input).await
    }

    async fn update_project(
        &self,
        id: &str,
        update: &UpdateProject,
    ) -> Result<Project, ServiceError> {
        self.put_json(&format!("/api/projects/{id}"), update).await
    }

    async fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/projects/{id}")).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError> {
        let mut params = Vec::new();
        if let Some(ref project_id) = filter.project_id {
            params.push(format!("project_id={project_id}"));
        }
        if let Some(status) = filter.status {
            params.push(format!("status={}", status.as_str()));
        }
        if let Some(priority) = filter.priority {
            params.push(format!("priority={}", priority.as_str()));
        }
        if let Some(due_before) = filter.due_before {
            params.push(format!("due_before={}", ts(due_before)));
        }
        if let Some(ref search) = filter.search {
            params.push(format!("search={search}"));
        }
        if let Some(sort_by) = filter.sort_by {
            params.push(format!("sort_by={}", sort_by.as_str()));
        }
        if let Some(dir) = filter.sort_dir {
            params.push(format!("sort_dir={}", dir.as_str()));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={limit}"));
        }
        self.get_json(&format!("/api/tasks{}", query_string(params)))
            .await
    }

    async fn get_task(&self, id: &str) -> Result<Task, ServiceError> {
        self.get_json(&format!("/api/tasks/{id}")).await
    }

    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
        self.post_json("/api/tasks", input).await
    }

    async fn update_task(&self, id: &str, update: &UpdateTask) -> Result<Task, ServiceError> {
        self.put_json(&format!("/api/tasks/{id}"), update).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/tasks/{id}")).await
    }

    async fn count_tasks_by_status(
        &self,
        project_id: &str,
    ) -> Result<Vec<(String, i64)>, ServiceError> {
        self.get_json(&format!(
            "/api/tasks/count-by-status?project_id={project_id}"
        ))
        .await
    }

    async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, ServiceError> {
        let mut params = Vec::new();
        if let Some(ref project_id) = filter.project_id {
            params.push(format!("project_id={project_id}"));
        }
        if let Some(ref task_id) = filter.task_id {
            params.push(format!("task_id={task_id}"));
        }
        if let Some(billable) = filter.billable {
            params.push(format!("billable={billable}"));
        }
        if let Some(since) = filter.since {
            params.push(format!("since={}", ts(since)));
        }
        if let Some(until) = filter.until {
            params.push(format!("until={}", ts(until)));
        }
        if let Some(running) = filter.running {
            params.push(format!("running={running}"));
        }
        if let Some(dir) = filter.sort_dir {
            params.push(format!("sort_dir={}", dir.as_str()));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={limit}"));
        }
        self.get_json(&format!("/api/time-entries{}", query_string(params)))
            .await
    }

    async fn get_time_entry(&self, id: &str) -> Result<TimeEntry, ServiceError> {
        self.get_json(&format!("/api/time-entries/{id}")).await
    }

    async fn create_time_entry(
        &self,
        input: &CreateTimeEntry,
    ) -> Result<TimeEntry, ServiceError> {
        self.post_json("/api/time-entries", input).await
    }

    async fn update_time_entry(
        &self,
        id: &str,
        update: &UpdateTimeEntry,
    ) -> Result<TimeEntry, ServiceError> {
        self.put_json(&format!("/api/time-entries/{id}"), update)
            .await
    }

    async fn delete_time_entry(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/time-entries/{id}")).await
    }

    async fn start_timer(&self, input: &StartTimer) -> Result<TimeEntry, ServiceError> {
        self.post_json("/api/timer/start", input).await
    }

    async fn stop_timer(&self) -> Result<TimeEntry, ServiceError> {
        self.post_empty("/api/timer/stop").await
    }

    async fn active_timer(&self) -> Result<Option<TimeEntry>, ServiceError> {
        self.get_json("/api/timer/active").await
    }

    async fn list_attachments(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
    ) -> Result<Vec<Attachment>, ServiceError> {
        self.get_json(&format!("/api/{}/{owner_id}/attachments", owner.plural()))
            .await
    }

    async fn get_attachment(&self, id: &str) -> Result<Attachment, ServiceError> {
        self.get_json(&format!("/api/attachments/{id}")).await
    }

    async fn delete_attachment(&self, id: &str) -> Result<Attachment, ServiceError> {
        self.delete_json(&format!("/api/attachments/{id}")).await
    }

    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, ServiceError> {
        let mut params = Vec::new();
        if filter.unread_only {
            params.push("unread_only=true".to_string());
        }
        if let Some(kind) = filter.kind {
            params.push(format!("kind={}", kind.as_str()));
        }
        if let Some(limit) = filter.limit {
            params.push(format!("limit={limit}"));
        }
        self.get_json(&format!("/api/notifications{}", query_string(params)))
            .await
    }

    async fn unread_count(&self) -> Result<i64, ServiceError> {
        let val: serde_json::Value = self.get_json("/api/notifications/unread-count").await?;
        val["count"]
            .as_i64()
            .ok_or_else(|| ServiceError::Internal("missing count in response".into()))
    }

    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, ServiceError> {
        self.post_json("/api/notifications", input).await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<Notification, ServiceError> {
        self.post_empty(&format!("/api/notifications/{id}/read")).await
    }

    async fn mark_all_notifications_read(&self) -> Result<i64, ServiceError> {
        let val: serde_json::Value = self.post_empty("/api/notifications/read-all").await?;
        val["marked"]
            .as_i64()
            .ok_or_else(|| ServiceError::Internal("missing marked in response".into()))
    }

    async fn delete_notification(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/notifications/{id}")).await
    }

    async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError> {
        self.get_json("/api/reports/dashboard").await
    }

    async fn revenue_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<RevenueReport, ServiceError> {
        let mut params = Vec::new();
        if let Some(since) = since {
            params.push(format!("since={}", ts(since)));
        }
        if let Some(until) = until {
            params.push(format!("until={}", ts(until)));
        }
        self.get_json(&format!("/api/reports/revenue{}", query_string(params)))
            .await
    }

    async fn utilization_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<UtilizationReport, ServiceError> {
        let mut params = Vec::new();
        if let Some(since) = since {
            params.push(format!("since={}", ts(since)));
        }
        if let Some(until) = until {
            params.push(format!("until={}", ts(until)));
        }
        self.get_json(&format!(
            "/api/reports/utilization{}",
            query_string(params)
        ))
        .await
    }

    async fn profitability_report(&self) -> Result<Vec<ProjectProfitability>, ServiceError> {
        self.get_json("/api/reports/profitability").await
    }

    async fn completion_report(&self) -> Result<Vec<ProjectCompletion>, ServiceError> {
        self.get_json("/api/reports/completion").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ts_uses_z_suffix() {
        let t = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        assert_eq!(ts(t), "2026-08-29T12:00:00Z");
    }

    #[test]
    fn query_string_joins_params() {
        assert_eq!(query_string(vec![]), "");
        assert_eq!(query_string(vec!["a=1".into()]), "?a=1");
        assert_eq!(
            query_string(vec!["a=1".into(), "b=2".into()]),
            "?a=1&b=2"
        );
    }

    #[tokio::test]
    async fn health_and_error_mapping_against_live_server() {
        let server = opsdesk_server::test_helpers::spawn_test_server().await;
        let svc = HttpService::new(&server.base_url);
        svc.health_check().await.unwrap();

        let err = svc.get_client("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
