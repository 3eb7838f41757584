//! Integration tests for HttpService against a real server.
//!
//! Each test spawns an in-process axum server on 127.0.0.1:0 with in-memory SQLite,
//! then exercises the HTTP client layer through the full request/response cycle.

use chrono::{Duration, Utc};

use opsdesk_core::client::{ClientFilter, ClientStatus, CreateClient, UpdateClient};
use opsdesk_core::notification::{CreateNotification, NotificationFilter, NotificationKind};
use opsdesk_core::project::{CreateProject, ProjectFilter, ProjectStatus, UpdateProject};
use opsdesk_core::task::{CreateTask, Priority, TaskFilter, TaskStatus, UpdateTask};
use opsdesk_core::time_entry::{CreateTimeEntry, StartTimer, TimeEntryFilter, UpdateTimeEntry};
use opsdesk_service::{HttpService, OpsService, ServiceError};

async fn spawn_server() -> String {
    let server = opsdesk_server::test_helpers::spawn_test_server().await;
    server.base_url
}

fn create_test_client() -> CreateClient {
    CreateClient {
        name: "Acme Fabrication".into(),
        email: "billing@acme.example".into(),
        company: "Acme".into(),
        phone: String::new(),
        address: String::new(),
        notes: String::new(),
        status: ClientStatus::Active,
    }
}

fn create_test_project(client_id: &str) -> CreateProject {
    CreateProject {
        client_id: client_id.into(),
        name: "Website Redesign".into(),
        description: "Full redesign".into(),
        status: ProjectStatus::Active,
        hourly_rate_cents: 9500,
        budget_cents: 500_000,
        starts_at: None,
        due_at: None,
    }
}

fn create_test_task(project_id: &str) -> CreateTask {
    CreateTask {
        project_id: project_id.into(),
        title: "Wireframes".into(),
        description: String::new(),
        status: TaskStatus::Todo,
        priority: Priority::Medium,
        due_at: None,
        estimated_minutes: Some(120),
    }
}

#[tokio::test]
async fn health_check_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    svc.health_check().await.unwrap();
}

#[tokio::test]
async fn client_crud_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);

    // Create
    let client = svc.create_client(&create_test_client()).await.unwrap();
    assert_eq!(client.name, "Acme Fabrication");
    assert_eq!(client.status, ClientStatus::Active);

    // Get
    let fetched = svc.get_client(&client.id).await.unwrap();
    assert_eq!(fetched.id, client.id);

    // List with search
    let found = svc
        .list_clients(&ClientFilter {
            search: Some("acme".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    // Update
    let updated = svc
        .update_client(
            &client.id,
            &UpdateClient {
                status: Some(ClientStatus::Archived),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ClientStatus::Archived);

    // Delete
    svc.delete_client(&client.id).await.unwrap();
    let all = svc.list_clients(&ClientFilter::default()).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn project_crud_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    let client = svc.create_client(&create_test_client()).await.unwrap();

    let project = svc
        .create_project(&create_test_project(&client.id))
        .await
        .unwrap();
    assert_eq!(project.hourly_rate_cents, 9500);

    let fetched = svc.get_project(&project.id).await.unwrap();
    assert_eq!(fetched.id, project.id);

    let by_client = svc
        .list_projects(&ProjectFilter {
            client_id: Some(client.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_client.len(), 1);

    let updated = svc
        .update_project(
            &project.id,
            &UpdateProject {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed");

    svc.delete_project(&project.id).await.unwrap();
    let all = svc.list_projects(&ProjectFilter::default()).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn task_crud_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    let client = svc.create_client(&create_test_client()).await.unwrap();
    let project = svc
        .create_project(&create_test_project(&client.id))
        .await
        .unwrap();

    let task = svc.create_task(&create_test_task(&project.id)).await.unwrap();
    assert_eq!(task.title, "Wireframes");

    let fetched = svc.get_task(&task.id).await.unwrap();
    assert_eq!(fetched.id, task.id);

    // Moving to done stamps completed_at
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
    assert!(done.completed_at.is_some());

    let counts = svc.count_tasks_by_status(&project.id).await.unwrap();
    assert!(!counts.is_empty());

    let done_only = svc
        .list_tasks(&TaskFilter {
            project_id: Some(project.id.clone()),
            status: Some(TaskStatus::Done),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(done_only.len(), 1);

    svc.delete_task(&task.id).await.unwrap();
    let all = svc
        .list_tasks(&TaskFilter {
            project_id: Some(project.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn null_clears_survive_the_http_transport() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    let client = svc.create_client(&create_test_client()).await.unwrap();
    let project = svc
        .create_project(&create_test_project(&client.id))
        .await
        .unwrap();

    let due = Utc::now() + Duration::days(14);
    let with_due = svc
        .update_project(
            &project.id,
            &UpdateProject {
                due_at: Some(Some(due)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(with_due.due_at.is_some());

    // An update that does not mention the field leaves it alone.
    let renamed = svc
        .update_project(
            &project.id,
            &UpdateProject {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(renamed.due_at.is_some());

    // Some(None) must arrive as an explicit null and clear the date.
    let cleared = svc
        .update_project(
            &project.id,
            &UpdateProject {
                due_at: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.due_at.is_none());

    // Same for reopening a finished time entry by clearing ended_at.
    let started = Utc::now() - Duration::hours(2);
    let entry = svc
        .create_time_entry(&CreateTimeEntry {
            project_id: project.id.clone(),
            task_id: None,
            description: "retro".into(),
            started_at: started,
            ended_at: Some(started + Duration::minutes(30)),
            billable: true,
            hourly_rate_cents: None,
        })
        .await
        .unwrap();
    assert!(entry.ended_at.is_some());

    let reopened = svc
        .update_time_entry(
            &entry.id,
            &UpdateTimeEntry {
                ended_at: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(reopened.is_running());

    let stopped = svc.stop_timer().await.unwrap();
    assert_eq!(stopped.id, entry.id);
}

#[tokio::test]
async fn timer_lifecycle_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    let client = svc.create_client(&create_test_client()).await.unwrap();
    let project = svc
        .create_project(&create_test_project(&client.id))
        .await
        .unwrap();

    // Nothing running
    assert!(svc.active_timer().await.unwrap().is_none());

    let entry = svc
        .start_timer(&StartTimer {
            project_id: project.id.clone(),
            task_id: None,
            description: "focus".into(),
            billable: true,
        })
        .await
        .unwrap();
    assert!(entry.ended_at.is_none());

    // A second start conflicts
    let err = svc
        .start_timer(&StartTimer {
            project_id: project.id.clone(),
            task_id: None,
            description: String::new(),
            billable: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let active = svc.active_timer().await.unwrap().unwrap();
    assert_eq!(active.id, entry.id);

    let stopped = svc.stop_timer().await.unwrap();
    assert_eq!(stopped.id, entry.id);
    assert!(stopped.ended_at.is_some());

    // Stopping again is NotFound
    let err = svc.stop_timer().await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let entries = svc
        .list_time_entries(&TimeEntryFilter {
            project_id: Some(project.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn notifications_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);

    let n = svc
        .create_notification(&CreateNotification {
            kind: NotificationKind::System,
            title: "Welcome".into(),
            body: String::new(),
            task_id: None,
        })
        .await
        .unwrap();
    assert!(n.is_unread());

    assert_eq!(svc.unread_count().await.unwrap(), 1);

    let read = svc.mark_notification_read(&n.id).await.unwrap();
    assert!(read.read_at.is_some());
    assert_eq!(svc.unread_count().await.unwrap(), 0);

    // Marking again keeps the original timestamp
    let again = svc.mark_notification_read(&n.id).await.unwrap();
    assert_eq!(again.read_at, read.read_at);

    svc.create_notification(&CreateNotification {
        kind: NotificationKind::System,
        title: "Second".into(),
        body: String::new(),
        task_id: None,
    })
    .await
    .unwrap();
    assert_eq!(svc.mark_all_notifications_read().await.unwrap(), 1);

    let unread = svc
        .list_notifications(&NotificationFilter {
            unread_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(unread.is_empty());

    svc.delete_notification(&n.id).await.unwrap();
    let all = svc
        .list_notifications(&NotificationFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn reports_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    let client = svc.create_client(&create_test_client()).await.unwrap();
    let project = svc
        .create_project(&create_test_project(&client.id))
        .await
        .unwrap();
    svc.create_task(&create_test_task(&project.id)).await.unwrap();

    let summary = svc.dashboard_summary().await.unwrap();
    assert_eq!(summary.active_clients, 1);
    assert_eq!(summary.active_projects, 1);
    assert_eq!(summary.open_tasks, 1);

    let revenue = svc.revenue_report(None, None).await.unwrap();
    assert_eq!(revenue.total_minutes, 0);

    let utilization = svc.utilization_report(None, None).await.unwrap();
    assert_eq!(utilization.tracked_minutes, 0);

    let profitability = svc.profitability_report().await.unwrap();
    assert_eq!(profitability.len(), 1);

    let completion = svc.completion_report().await.unwrap();
    assert_eq!(completion.len(), 1);
}

#[tokio::test]
async fn attachment_upload_download_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);
    let client = svc.create_client(&create_test_client()).await.unwrap();
    let project = svc
        .create_project(&create_test_project(&client.id))
        .await
        .unwrap();
    let task = svc.create_task(&create_test_task(&project.id)).await.unwrap();

    use opsdesk_core::attachment::AttachmentOwner;

    let attachment = svc
        .upload_attachment(
            AttachmentOwner::Task,
            &task.id,
            "notes.txt",
            "text/plain",
            bytes::Bytes::from_static(b"meeting notes"),
        )
        .await
        .unwrap();
    assert_eq!(attachment.filename, "notes.txt");
    assert_eq!(attachment.size_bytes, 13);

    let listed = svc
        .list_attachments(AttachmentOwner::Task, &task.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let body = svc.download_attachment(&attachment.id).await.unwrap();
    assert_eq!(&body[..], b"meeting notes");

    let deleted = svc.delete_attachment(&attachment.id).await.unwrap();
    assert_eq!(deleted.id, attachment.id);
    let listed = svc
        .list_attachments(AttachmentOwner::Task, &task.id)
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn error_responses_via_http() {
    let url = spawn_server().await;
    let svc = HttpService::new(&url);

    // 404 NotFound
    let err = svc
        .get_client("00000000-0000-0000-0000-000000000000")
        .await
        .unwrap_err();
    assert!(
        matches!(err, ServiceError::NotFound(_)),
        "expected NotFound, got: {err:?}"
    );

    // 400 InvalidInput: bad email rejected before any write
    let err = svc
        .create_client(&CreateClient {
            name: "Bad".into(),
            email: "not-an-email".into(),
            company: String::new(),
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
            status: ClientStatus::Active,
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, ServiceError::InvalidInput(_)),
        "expected InvalidInput, got: {err:?}"
    );

    // Project for a missing client is NotFound
    let err = svc
        .create_project(&create_test_project("missing-client"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn auth_headers_propagation() {
    let url = spawn_server().await;

    // with_api_key constructor; the server has no auth, so this still works
    let svc = HttpService::with_api_key(&url, "fake-key-123".into());
    svc.health_check().await.unwrap();
    let clients = svc.list_clients(&ClientFilter::default()).await.unwrap();
    assert!(clients.is_empty());
}
