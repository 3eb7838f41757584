use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sort::SortDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Archived,
}

impl ClientStatus {
    pub const ALL: &[ClientStatus] = &[ClientStatus::Active, ClientStatus::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Archived => "archived",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClientStatus::Active => "Active",
            ClientStatus::Archived => "Archived",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ClientStatus::Active),
            "archived" => Some(ClientStatus::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub notes: String,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_status")]
    pub status: ClientStatus,
}

fn default_status() -> ClientStatus {
    ClientStatus::Active
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSortField {
    Name,
    Company,
    CreatedAt,
}

impl ClientSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientSortField::Name => "name",
            ClientSortField::Company => "company",
            ClientSortField::CreatedAt => "created_at",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(ClientSortField::Name),
            "company" => Some(ClientSortField::Company),
            "created_at" => Some(ClientSortField::CreatedAt),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            ClientSortField::Name => "LOWER(name)",
            ClientSortField::Company => "LOWER(company)",
            ClientSortField::CreatedAt => "created_at",
        }
    }
}

/// Conjunctive filter for client listings. `search` matches name, company,
/// or email as a case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub status: Option<ClientStatus>,
    pub search: Option<String>,
    pub sort_by: Option<ClientSortField>,
    pub sort_dir: Option<SortDir>,
    pub limit: Option<i64>,
}
