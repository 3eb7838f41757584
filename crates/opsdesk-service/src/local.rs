use async_trait::async_trait;
use chrono::{DateTime, Utc};

use opsdesk_core::attachment::{Attachment, AttachmentOwner, CreateAttachment};
use opsdesk_core::client::{Client, ClientFilter, CreateClient, UpdateClient};
use opsdesk_core::notification::{CreateNotification, Notification, NotificationFilter};
use opsdesk_core::project::{CreateProject, Project, ProjectFilter, UpdateProject};
use opsdesk_core::report::{
    self, DashboardSummary, ProjectCompletion, ProjectProfitability, RevenueReport,
    UtilizationReport,
};
use opsdesk_core::task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask};
use opsdesk_core::time_entry::{
    CreateTimeEntry, StartTimer, TimeEntry, TimeEntryFilter, UpdateTimeEntry,
};
use opsdesk_core::validate;
use opsdesk_db::Db;

use crate::{OpsService, ServiceError};

/// Local implementation backed by direct SQLite access. Validation and the
/// business rules (timer exclusivity, completed_at bookkeeping, foreign-key
/// existence checks) live here so every front end gets the same behavior.
pub struct LocalService {
    db: Db,
}

impl LocalService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn check_owner_exists(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
    ) -> Result<(), ServiceError> {
        match owner {
            AttachmentOwner::Client => self.db.get_client(owner_id).map(|_| ())?,
            AttachmentOwner::Project => self.db.get_project(owner_id).map(|_| ())?,
            AttachmentOwner::Task => self.db.get_task(owner_id).map(|_| ())?,
        }
        Ok(())
    }

    fn check_task_belongs(&self, task_id: &str, project_id: &str) -> Result<(), ServiceError> {
        let task = self.db.get_task(task_id)?;
        if task.project_id != project_id {
            return Err(ServiceError::InvalidInput(format!(
                "task {task_id} does not belong to project {project_id}"
            )));
        }
        Ok(())
    }

    /// Insert the metadata row for an uploaded blob. The caller picks the id
    /// up front so the store key can embed it; the blob write itself happens
    /// at the transport layer.
    pub fn create_attachment(
        &self,
        id: &str,
        input: &CreateAttachment,
        store_key: &str,
    ) -> Result<Attachment, ServiceError> {
        if input.filename.trim().is_empty() {
            return Err(ServiceError::InvalidInput("filename is required".into()));
        }
        self.check_owner_exists(input.owner, &input.owner_id)?;
        Ok(self.db.create_attachment_with_id(id, input, store_key)?)
    }
}

impl From<opsdesk_db::DbError> for ServiceError {
    fn from(e: opsdesk_db::DbError) -> Self {
        match e {
            opsdesk_db::DbError::NotFound(msg) => ServiceError::NotFound(msg),
            opsdesk_db::DbError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<validate::ValidationError> for ServiceError {
    fn from(e: validate::ValidationError) -> Self {
        ServiceError::InvalidInput(e.0)
    }
}

#[async_trait]
impl OpsService for LocalService {
    async fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, ServiceError> {
        Ok(self.db.list_clients(filter)?)
    }

    async fn get_client(&self, id: &str) -> Result<Client, ServiceError> {
        Ok(self.db.get_client(id)?)
    }

    async fn create_client(&self, input: &CreateClient) -> Result<Client, ServiceError> {
        validate::create_client(input)?;
        Ok(self.db.create_client(input)?)
    }

    async fn update_client(
        &self,
        id: &str,
        update: &UpdateClient,
    ) -> Result<Client, ServiceError> {
        validate::update_client(update)?;
        Ok(self.db.update_client(id, update)?)
    }

    async fn delete_client(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.db.delete_client(id)?)
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, ServiceError> {
        Ok(self.db.list_projects(filter)?)
    }

    async fn get_project(&self, id: &str) -> Result<Project, ServiceError> {
        Ok(self.db.get_project(id)?)
    }

    async fn create_project(&self, input: &CreateProject) -> Result<Project, ServiceError> {
        validate::create_project(input)?;
        self.db.get_client(&input.client_id)?;
        Ok(self.db.create_project(input)?)
    }

    async fn update_project(
        &self,
        id: &str,
        update: &UpdateProject,
    ) -> Result<Project, ServiceError> {
        let stored = self.db.get_project(id)?;
        validate::update_project(&stored, update)?;
        Ok(self.db.update_project(id, update)?)
    }

    async fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.db.delete_project(id)?)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError> {
        Ok(self.db.list_tasks(filter)?)
    }

    async fn get_task(&self, id: &str) -> Result<Task, ServiceError> {
        Ok(self.db.get_task(id)?)
    }

    async fn create_task(&self, input: &CreateTask) -> Result<Task, ServiceError> {
        validate::create_task(input)?;
        self.db.get_project(&input.project_id)?;
        Ok(self.db.create_task(input)?)
    }

    async fn update_task(&self, id: &str, update: &UpdateTask) -> Result<Task, ServiceError> {
        validate::update_task(update)?;
        let stored = self.db.get_task(id)?;

        // Moving into Done stamps completed_at; moving out clears it.
        let mut update = update.clone();
        if update.completed_at.is_none() {
            if let Some(new_status) = update.status {
                if new_status == TaskStatus::Done && stored.completed_at.is_none() {
                    update.completed_at = Some(Some(Utc::now()));
                } else if new_status != TaskStatus::Done && stored.completed_at.is_some() {
                    update.completed_at = Some(None);
                }
            }
        }

        Ok(self.db.update_task(id, &update)?)
    }

    async fn delete_task(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.db.delete_task(id)?)
    }

    async fn count_tasks_by_status(
        &self,
        project_id: &str,
    ) -> Result<Vec<(String, i64)>, ServiceError> {
        Ok(self.db.count_tasks_by_status(project_id)?)
    }

    async fn list_time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, ServiceError> {
        Ok(self.db.list_time_entries(filter)?)
    }

    async fn get_time_entry(&self, id: &str) -> Result<TimeEntry, ServiceError> {
        Ok(self.db.get_time_entry(id)?)
    }

    async fn create_time_entry(
        &self,
        input: &CreateTimeEntry,
    ) -> Result<TimeEntry, ServiceError> {
        validate::create_time_entry(input)?;
        self.db.get_project(&input.project_id)?;
        if let Some(ref task_id) = input.task_id {
            self.check_task_belongs(task_id, &input.project_id)?;
        }
        Ok(self.db.create_time_entry(input)?)
    }

    async fn update_time_entry(
        &self,
        id: &str,
        update: &UpdateTimeEntry,
    ) -> Result<TimeEntry, ServiceError> {
        let stored = self.db.get_time_entry(id)?;
        validate::update_time_entry(&stored, update)?;
        if let Some(Some(ref task_id)) = update.task_id {
            self.check_task_belongs(task_id, &stored.project_id)?;
        }
        Ok(self.db.update_time_entry(id, update)?)
    }

    async fn delete_time_entry(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.db.delete_time_entry(id)?)
    }

    async fn start_timer(&self, input: &StartTimer) -> Result<TimeEntry, ServiceError> {
        if self.db.active_time_entry()?.is_some() {
            return Err(ServiceError::InvalidInput(
                "a timer is already running".into(),
            ));
        }
        self.db.get_project(&input.project_id)?;
        if let Some(ref task_id) = input.task_id {
            self.check_task_belongs(task_id, &input.project_id)?;
        }
        Ok(self.db.start_time_entry(input)?)
    }

    async fn stop_timer(&self) -> Result<TimeEntry, ServiceError> {
        let running = self
            .db
            .active_time_entry()?
            .ok_or_else(|| ServiceError::NotFound("no running timer".into()))?;
        let update = UpdateTimeEntry {
            ended_at: Some(Some(Utc::now())),
            ..Default::default()
        };
        Ok(self.db.update_time_entry(&running.id, &update)?)
    }

    async fn active_timer(&self) -> Result<Option<TimeEntry>, ServiceError> {
        Ok(self.db.active_time_entry()?)
    }

    async fn list_attachments(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
    ) -> Result<Vec<Attachment>, ServiceError> {
        Ok(self.db.list_attachments(owner, owner_id)?)
    }

    async fn get_attachment(&self, id: &str) -> Result<Attachment, ServiceError> {
        Ok(self.db.get_attachment(id)?)
    }

    async fn delete_attachment(&self, id: &str) -> Result<Attachment, ServiceError> {
        Ok(self.db.delete_attachment(id)?)
    }

    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.db.list_notifications(filter)?)
    }

    async fn unread_count(&self) -> Result<i64, ServiceError> {
        Ok(self.db.unread_notification_count()?)
    }

    async fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("title is required".into()));
        }
        Ok(self.db.create_notification(input)?)
    }

    async fn mark_notification_read(&self, id: &str) -> Result<Notification, ServiceError> {
        Ok(self.db.mark_notification_read(id)?)
    }

    async fn mark_all_notifications_read(&self) -> Result<i64, ServiceError> {
        Ok(self.db.mark_all_notifications_read()?)
    }

    async fn delete_notification(&self, id: &str) -> Result<(), ServiceError> {
        Ok(self.db.delete_notification(id)?)
    }

    async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError> {
        let now = Utc::now();
        let (tracked, billable) = self.db.sum_minutes_between(report::week_start(now), now)?;
        Ok(DashboardSummary {
            active_clients: self.db.count_active_clients()?,
            active_projects: self.db.count_active_projects()?,
            open_tasks: self.db.count_open_tasks()?,
            overdue_tasks: self.db.count_overdue_tasks(now)?,
            tracked_minutes_this_week: tracked,
            billable_minutes_this_week: billable,
            unread_notifications: self.db.unread_notification_count()?,
        })
    }

    async fn revenue_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<RevenueReport, ServiceError> {
        let clients = self.db.list_clients(&ClientFilter::default())?;
        let projects = self.db.list_projects(&ProjectFilter::default())?;
        let entries = self.db.list_time_entries(&TimeEntryFilter {
            since,
            until,
            ..Default::default()
        })?;
        Ok(report::revenue_by_client(&clients, &projects, &entries))
    }

    async fn utilization_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<UtilizationReport, ServiceError> {
        let entries = self.db.list_time_entries(&TimeEntryFilter {
            since,
            until,
            ..Default::default()
        })?;
        Ok(report::utilization(&entries))
    }

    async fn profitability_report(&self) -> Result<Vec<ProjectProfitability>, ServiceError> {
        let projects = self.db.list_projects(&ProjectFilter::default())?;
        let entries = self.db.list_time_entries(&TimeEntryFilter::default())?;
        Ok(report::project_profitability(&projects, &entries))
    }

    async fn completion_report(&self) -> Result<Vec<ProjectCompletion>, ServiceError> {
        let projects = self.db.list_projects(&ProjectFilter::default())?;
        let tasks = self.db.list_tasks(&TaskFilter::default())?;
        Ok(report::task_completion(&projects, &tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_core::client::ClientStatus;
    use opsdesk_core::project::ProjectStatus;
    use opsdesk_core::task::Priority;

    fn service() -> LocalService {
        LocalService::new(Db::open_in_memory().unwrap())
    }

    async fn seed_project(svc: &LocalService) -> Project {
        let client = svc
            .create_client(&CreateClient {
                name: "Acme".into(),
                email: "acme@example.com".into(),
                company: String::new(),
                phone: String::new(),
                address: String::new(),
                notes: String::new(),
                status: ClientStatus::Active,
            })
            .await
            .unwrap();
        svc.create_project(&CreateProject {
            client_id: client.id,
            name: "Site".into(),
            description: String::new(),
            status: ProjectStatus::Active,
            hourly_rate_cents: 6000,
            budget_cents: 0,
            starts_at: None,
            due_at: None,
        })
        .await
        .unwrap()
    }

    fn task_input(project_id: &str) -> CreateTask {
        CreateTask {
            project_id: project_id.into(),
            title: "Do the thing".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: None,
            estimated_minutes: None,
        }
    }

    #[tokio::test]
    async fn create_client_rejects_bad_email() {
        let svc = service();
        let err = svc
            .create_client(&CreateClient {
                name: "Acme".into(),
                email: "not-an-email".into(),
                company: String::new(),
                phone: String::new(),
                address: String::new(),
                notes: String::new(),
                status: ClientStatus::Active,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_project_requires_existing_client() {
        let svc = service();
        let err = svc
            .create_project(&CreateProject {
                client_id: "missing".into(),
                name: "Orphan".into(),
                description: String::new(),
                status: ProjectStatus::Planned,
                hourly_rate_cents: 0,
                budget_cents: 0,
                starts_at: None,
                due_at: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn done_transition_stamps_completed_at() {
        let svc = service();
        let project = seed_project(&svc).await;
        let task = svc.create_task(&task_input(&project.id)).await.unwrap();
        assert!(task.completed_at.is_none());

        let done = svc
            .update_task(
                &task.id,
                &UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let stamped = done.completed_at.expect("stamped on Done");

        // Re-saving as Done keeps the original stamp.
        let again = svc
            .update_task(
                &task.id,
                &UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again.completed_at, Some(stamped));

        // Reopening clears it.
        let reopened = svc
            .update_task(
                &task.id,
                &UpdateTask {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn timer_is_exclusive() {
        let svc = service();
        let project = seed_project(&svc).await;
        let start = StartTimer {
            project_id: project.id.clone(),
            task_id: None,
            description: "focus".into(),
            billable: true,
        };

        let running = svc.start_timer(&start).await.unwrap();
        assert!(running.is_running());
        assert!(svc.active_timer().await.unwrap().is_some());

        let err = svc.start_timer(&start).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let stopped = svc.stop_timer().await.unwrap();
        assert_eq!(stopped.id, running.id);
        assert!(stopped.ended_at.is_some());
        assert!(svc.active_timer().await.unwrap().is_none());

        let err = svc.stop_timer().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn time_entry_task_must_belong_to_project() {
        let svc = service();
        let project_a = seed_project(&svc).await;
        let project_b = {
            let client = svc
                .create_client(&CreateClient {
                    name: "Beta".into(),
                    email: "beta@example.com".into(),
                    company: String::new(),
                    phone: String::new(),
                    address: String::new(),
                    notes: String::new(),
                    status: ClientStatus::Active,
                })
                .await
                .unwrap();
            svc.create_project(&CreateProject {
                client_id: client.id,
                name: "Other".into(),
                description: String::new(),
                status: ProjectStatus::Active,
                hourly_rate_cents: 0,
                budget_cents: 0,
                starts_at: None,
                due_at: None,
            })
            .await
            .unwrap()
        };
        let foreign_task = svc.create_task(&task_input(&project_b.id)).await.unwrap();

        let now = Utc::now();
        let err = svc
            .create_time_entry(&CreateTimeEntry {
                project_id: project_a.id,
                task_id: Some(foreign_task.id),
                description: String::new(),
                started_at: now - chrono::Duration::hours(1),
                ended_at: Some(now),
                billable: true,
                hourly_rate_cents: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn dashboard_reflects_current_state() {
        let svc = service();
        let project = seed_project(&svc).await;
        svc.create_task(&task_input(&project.id)).await.unwrap();
        svc.create_task(&CreateTask {
            due_at: Some(Utc::now() - chrono::Duration::days(1)),
            ..task_input(&project.id)
        })
        .await
        .unwrap();

        let now = Utc::now();
        svc.create_time_entry(&CreateTimeEntry {
            project_id: project.id.clone(),
            task_id: None,
            description: String::new(),
            started_at: now - chrono::Duration::minutes(10),
            ended_at: Some(now),
            billable: true,
            hourly_rate_cents: None,
        })
        .await
        .unwrap();

        let summary = svc.dashboard_summary().await.unwrap();
        assert_eq!(summary.active_clients, 1);
        assert_eq!(summary.active_projects, 1);
        assert_eq!(summary.open_tasks, 2);
        assert_eq!(summary.overdue_tasks, 1);
        assert!(summary.tracked_minutes_this_week >= 9);
        assert_eq!(
            summary.tracked_minutes_this_week,
            summary.billable_minutes_this_week
        );
    }

    #[tokio::test]
    async fn revenue_report_respects_date_window() {
        let svc = service();
        let project = seed_project(&svc).await;
        let now = Utc::now();

        for days_ago in [1i64, 10] {
            let started = now - chrono::Duration::days(days_ago);
            svc.create_time_entry(&CreateTimeEntry {
                project_id: project.id.clone(),
                task_id: None,
                description: String::new(),
                started_at: started,
                ended_at: Some(started + chrono::Duration::minutes(60)),
                billable: true,
                hourly_rate_cents: None,
            })
            .await
            .unwrap();
        }

        let all = svc.revenue_report(None, None).await.unwrap();
        assert_eq!(all.total_minutes, 120);
        assert_eq!(all.total_cents, 12_000);

        let recent = svc
            .revenue_report(Some(now - chrono::Duration::days(5)), None)
            .await
            .unwrap();
        assert_eq!(recent.total_minutes, 60);
    }
}
