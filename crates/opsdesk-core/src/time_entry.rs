use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sort::SortDir;

/// A tracked block of time. An entry with `ended_at = NULL` is the running
/// stopwatch; at most one such entry exists at a time (service invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub billable: bool,
    /// Overrides the project rate when set; `None` inherits the project's
    /// rate at reporting time.
    pub hourly_rate_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Elapsed whole minutes, floored. For a running entry this is the
    /// wall-clock elapsed time against `now`, so a once-per-second UI poll
    /// is a pure function of the clock.
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_minutes().max(0)
    }
}

/// `"2h 05m"`-style rendering for tracked durations.
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Manual entry: `ended_at` is required at validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTimeEntry {
    pub project_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default = "default_billable")]
    pub billable: bool,
    #[serde(default)]
    pub hourly_rate_cents: Option<i64>,
}

fn default_billable() -> bool {
    true
}

/// Fields wrapped in `Option<Option<T>>` distinguish "leave unchanged"
/// (absent) from "clear" (explicit `null`); see [`crate::patch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTimeEntry {
    #[serde(
        default,
        deserialize_with = "crate::patch::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "crate::patch::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billable: Option<bool>,
    #[serde(
        default,
        deserialize_with = "crate::patch::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub hourly_rate_cents: Option<Option<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTimer {
    pub project_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_billable")]
    pub billable: bool,
}

/// Listing is ordered by `started_at`.
#[derive(Debug, Clone, Default)]
pub struct TimeEntryFilter {
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub billable: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub running: Option<bool>,
    pub sort_dir: Option<SortDir>,
    pub limit: Option<i64>,
}
