use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

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

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Abstraction over the business-management operations.
///
/// The HTTP server and any front end program against this trait.
/// `LocalService` wraps a direct SQLite connection and carries the business
/// rules; `HttpService` talks to a running opsdesk-server.
#[async_trait]
pub trait OpsService: Send + Sync {
    // -- Clients --
    async fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, ServiceError>;
    async fn get_client(&self, id: &str) -> Result<Client, ServiceError>;
    async fn create_client(&self, input: &CreateClient) -> Result<Client, ServiceError>;
    async fn update_client(&self, id: &str, update: &UpdateClient)
        -> Result<Client, ServiceError>;
    async fn delete_client(&self, id: &str) -> Result<(), ServiceError>;

    // -- Projects --
    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, ServiceError>;
    async fn get_project(&self, id: &str) -> Result<Project, ServiceError>;
    async fn create_project(&self, input: &CreateProject) -> Result<Project, ServiceError>;
    async fn update_project(
        &self,
        id: &str,
        update: &UpdateProject,
    ) -> Result<Project, ServiceError>;
    async fn delete_project(&self, id: &str) -> Result<(), ServiceError>;

    // -- Tasks --
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError>;
    async fn get_task(&self, id: &str) -> Result<Task, ServiceError>;
    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError>;
    async fn update_task(&self, id: &str, update: &UpdateTask) -> Result<Task, ServiceError>;
    async fn delete_task(&self, id: &str) -> Result<(), ServiceError>;
    async fn count_tasks_by_status(
        &self,
        project_id: &str,
    ) -> Result<Vec<(String, i64)>, ServiceError>;

    // -- Time entries --
    async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, ServiceError>;
    async fn get_time_entry(&self, id: &str) -> Result<TimeEntry, ServiceError>;
    async fn create_time_entry(&self, input: &CreateTimeEntry)
        -> Result<TimeEntry, ServiceError>;
    async fn update_time_entry(
        &self,
        id: &str,
        update: &UpdateTimeEntry,
    ) -> Result<TimeEntry, ServiceError>;
    async fn delete_time_entry(&self, id: &str) -> Result<(), ServiceError>;

    // -- Timer --
    async fn start_timer(&self, input: &StartTimer) -> Result<TimeEntry, ServiceError>;
    async fn stop_timer(&self) -> Result<TimeEntry, ServiceError>;
    async fn active_timer(&self) -> Result<Option<TimeEntry>, ServiceError>;

    // -- Attachments (metadata; blob transfer is transport-specific) --
    async fn list_attachments(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
    ) -> Result<Vec<Attachment>, ServiceError>;
    async fn get_attachment(&self, id: &str) -> Result<Attachment, ServiceError>;
    async fn delete_attachment(&self, id: &str) -> Result<Attachment, ServiceError>;

    // -- Notifications --
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, ServiceError>;
    async fn unread_count(&self) -> Result<i64, ServiceError>;
    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, ServiceError>;
    async fn mark_notification_read(&self, id: &str) -> Result<Notification, ServiceError>;
    async fn mark_all_notifications_read(&self) -> Result<i64, ServiceError>;
    async fn delete_notification(&self, id: &str) -> Result<(), ServiceError>;

    // -- Reports --
    async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError>;
    async fn revenue_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<RevenueReport, ServiceError>;
    async fn utilization_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<UtilizationReport, ServiceError>;
    async fn profitability_report(&self) -> Result<Vec<ProjectProfitability>, ServiceError>;
    async fn completion_report(&self) -> Result<Vec<ProjectCompletion>, ServiceError>;
}
