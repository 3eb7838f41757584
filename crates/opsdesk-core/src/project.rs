use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sort::SortDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planned,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: &[ProjectStatus] = &[
        ProjectStatus::Planned,
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planned",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "Planned",
            ProjectStatus::Active => "Active",
            ProjectStatus::OnHold => "On Hold",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(ProjectStatus::Planned),
            "active" => Some(ProjectStatus::Active),
            "on_hold" => Some(ProjectStatus::OnHold),
            "completed" => Some(ProjectStatus::Completed),
            "cancelled" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Money is integer cents. A zero `hourly_rate_cents` means non-billable;
/// a zero `budget_cents` means no budget is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub client_id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub hourly_rate_cents: i64,
    pub budget_cents: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: ProjectStatus,
    #[serde(default)]
    pub hourly_rate_cents: i64,
    #[serde(default)]
    pub budget_cents: i64,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

fn default_status() -> ProjectStatus {
    ProjectStatus::Planned
}

/// Fields wrapped in `Option<Option<T>>` distinguish "leave unchanged"
/// (absent) from "clear" (explicit `null`); see [`crate::patch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_cents: Option<i64>,
    #[serde(
        default,
        deserialize_with = "crate::patch::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "crate::patch::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSortField {
    Name,
    CreatedAt,
    DueAt,
}

impl ProjectSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectSortField::Name => "name",
            ProjectSortField::CreatedAt => "created_at",
            ProjectSortField::DueAt => "due_at",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(ProjectSortField::Name),
            "created_at" => Some(ProjectSortField::CreatedAt),
            "due_at" => Some(ProjectSortField::DueAt),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            ProjectSortField::Name => "LOWER(name)",
            ProjectSortField::CreatedAt => "created_at",
            ProjectSortField::DueAt => "due_at",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub client_id: Option<String>,
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
    pub sort_by: Option<ProjectSortField>,
    pub sort_dir: Option<SortDir>,
    pub limit: Option<i64>,
}
