use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskDue,
    TaskOverdue,
    TimerReminder,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskDue => "task_due",
            NotificationKind::TaskOverdue => "task_overdue",
            NotificationKind::TimerReminder => "timer_reminder",
            NotificationKind::System => "system",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NotificationKind::TaskDue => "Task Due",
            NotificationKind::TaskOverdue => "Task Overdue",
            NotificationKind::TimerReminder => "Timer Reminder",
            NotificationKind::System => "System",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "task_due" => Some(NotificationKind::TaskDue),
            "task_overdue" => Some(NotificationKind::TaskOverdue),
            "timer_reminder" => Some(NotificationKind::TimerReminder),
            "system" => Some(NotificationKind::System),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// `read_at = NULL` means unread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub task_id: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Listing is newest-first.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub kind: Option<NotificationKind>,
    pub limit: Option<i64>,
}
