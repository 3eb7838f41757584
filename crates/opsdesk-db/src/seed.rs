//! Demo data for trying out the app against a fresh database.

use chrono::{Duration, Utc};

use opsdesk_core::client::{ClientStatus, CreateClient};
use opsdesk_core::notification::{CreateNotification, NotificationKind};
use opsdesk_core::project::{CreateProject, ProjectStatus};
use opsdesk_core::task::{CreateTask, Priority, TaskStatus, UpdateTask};
use opsdesk_core::time_entry::CreateTimeEntry;

use crate::{Db, DbError};

impl Db {
    /// Populate an empty database with a handful of clients, projects,
    /// tasks and finished time entries. Refuses to run if any client
    /// already exists so it cannot clobber real data.
    pub fn seed_demo(&self) -> Result<(), DbError> {
        let existing = self.list_clients(&Default::default())?;
        if !existing.is_empty() {
            return Err(DbError::InvalidInput(
                "database already has data; seeding is only for fresh installs".into(),
            ));
        }

        let now = Utc::now();

        let acme = self.create_client(&CreateClient {
            name: "Dana Reeves".into(),
            company: "Acme Fabrication".into(),
            email: "dana@acmefab.example".into(),
            phone: "+1 555 0101".into(),
            address: "12 Foundry Row".into(),
            notes: "Prefers email. Net-30 invoicing.".into(),
            status: ClientStatus::Active,
        })?;
        let northwind = self.create_client(&CreateClient {
            name: "Sam Ortiz".into(),
            company: "Northwind Studio".into(),
            email: "sam@northwind.example".into(),
            phone: "+1 555 0102".into(),
            address: String::new(),
            notes: String::new(),
            status: ClientStatus::Active,
        })?;
        self.create_client(&CreateClient {
            name: "Lee Tanaka".into(),
            company: "Former Client Co".into(),
            email: "lee@formerclient.example".into(),
            phone: String::new(),
            address: String::new(),
            notes: "Wrapped up in spring.".into(),
            status: ClientStatus::Archived,
        })?;

        let website = self.create_project(&CreateProject {
            client_id: acme.id.clone(),
            name: "Website Redesign".into(),
            description: "New marketing site with CMS handoff.".into(),
            status: ProjectStatus::Active,
            hourly_rate_cents: 12_500,
            budget_cents: 1_200_000,
            starts_at: Some(now - Duration::days(21)),
            due_at: Some(now + Duration::days(30)),
        })?;
        let audit = self.create_project(&CreateProject {
            client_id: acme.id,
            name: "Accessibility Audit".into(),
            description: String::new(),
            status: ProjectStatus::Planned,
            hourly_rate_cents: 15_000,
            budget_cents: 0,
            starts_at: Some(now + Duration::days(14)),
            due_at: None,
        })?;
        let branding = self.create_project(&CreateProject {
            client_id: northwind.id.clone(),
            name: "Brand Refresh".into(),
            description: "Logo, palette, and collateral templates.".into(),
            status: ProjectStatus::Active,
            hourly_rate_cents: 10_000,
            budget_cents: 600_000,
            starts_at: Some(now - Duration::days(10)),
            due_at: Some(now + Duration::days(20)),
        })?;
        self.create_project(&CreateProject {
            client_id: northwind.id,
            name: "Holiday Campaign".into(),
            description: String::new(),
            status: ProjectStatus::Completed,
            hourly_rate_cents: 10_000,
            budget_cents: 250_000,
            starts_at: Some(now - Duration::days(90)),
            due_at: Some(now - Duration::days(30)),
        })?;

        let wireframes = self.create_task(&CreateTask {
            project_id: website.id.clone(),
            title: "Wireframes for landing page".into(),
            description: "Desktop and mobile breakpoints.".into(),
            status: TaskStatus::Done,
            priority: Priority::High,
            due_at: Some(now - Duration::days(7)),
            estimated_minutes: Some(480),
        })?;
        self.update_task(
            &wireframes.id,
            &UpdateTask {
                completed_at: Some(Some(now - Duration::days(8))),
                ..Default::default()
            },
        )?;
        self.create_task(&CreateTask {
            project_id: website.id.clone(),
            title: "Build CMS templates".into(),
            description: String::new(),
            status: TaskStatus::InProgress,
            priority: Priority::Urgent,
            due_at: Some(now + Duration::days(3)),
            estimated_minutes: Some(960),
        })?;
        self.create_task(&CreateTask {
            project_id: website.id.clone(),
            title: "Content migration plan".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_at: Some(now + Duration::days(10)),
            estimated_minutes: None,
        })?;
        self.create_task(&CreateTask {
            project_id: audit.id,
            title: "Collect current WCAG findings".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            due_at: None,
            estimated_minutes: Some(240),
        })?;
        self.create_task(&CreateTask {
            project_id: branding.id.clone(),
            title: "Logo concepts round one".into(),
            description: "Three directions for review.".into(),
            status: TaskStatus::Review,
            priority: Priority::High,
            due_at: Some(now + Duration::days(1)),
            estimated_minutes: Some(600),
        })?;

        for (project_id, days_ago, minutes, billable, description) in [
            (&website.id, 5, 180, true, "Wireframe revisions"),
            (&website.id, 3, 240, true, "Template build"),
            (&website.id, 2, 45, false, "Internal sync"),
            (&branding.id, 4, 120, true, "Moodboards"),
            (&branding.id, 1, 90, true, "Concept sketches"),
        ] {
            let started = now - Duration::days(days_ago);
            self.create_time_entry(&CreateTimeEntry {
                project_id: project_id.clone(),
                task_id: None,
                description: description.into(),
                started_at: started,
                ended_at: Some(started + Duration::minutes(minutes)),
                billable,
                hourly_rate_cents: None,
            })?;
        }

        self.create_notification(&CreateNotification {
            kind: NotificationKind::System,
            title: "Welcome to OpsDesk".into(),
            body: "Demo data is loaded. Explore clients, projects and reports.".into(),
            task_id: None,
        })?;

        Ok(())
    }
}
