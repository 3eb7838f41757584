use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity kinds that can own file attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentOwner {
    Client,
    Project,
    Task,
}

impl AttachmentOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentOwner::Client => "client",
            AttachmentOwner::Project => "project",
            AttachmentOwner::Task => "task",
        }
    }

    /// Plural form used in object-store keys and route paths.
    pub fn plural(&self) -> &'static str {
        match self {
            AttachmentOwner::Client => "clients",
            AttachmentOwner::Project => "projects",
            AttachmentOwner::Task => "tasks",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "client" => Some(AttachmentOwner::Client),
            "project" => Some(AttachmentOwner::Project),
            "task" => Some(AttachmentOwner::Task),
            _ => None,
        }
    }
}

/// Attachment metadata. The blob itself lives in the object store under
/// `store_key`; this row is bookkeeping only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub owner: AttachmentOwner,
    pub owner_id: String,
    pub filename: String,
    pub store_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttachment {
    pub owner: AttachmentOwner,
    pub owner_id: String,
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: i64,
}
