use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::project::Project;
use crate::task::{Task, TaskStatus};
use crate::time_entry::TimeEntry;

/// Headline numbers for the dashboard. Assembled by the service layer from
/// aggregate queries; the week window starts at `week_start(now)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub active_clients: i64,
    pub active_projects: i64,
    pub open_tasks: i64,
    pub overdue_tasks: i64,
    pub tracked_minutes_this_week: i64,
    pub billable_minutes_this_week: i64,
    pub unread_notifications: i64,
}

/// Most recent Monday 00:00 UTC at or before `now`.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_back = now.weekday().num_days_from_monday() as i64;
    let monday = now.date_naive() - Duration::days(days_back);
    monday
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRevenue {
    pub client_id: String,
    pub client_name: String,
    pub billable_minutes: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueReport {
    pub clients: Vec<ClientRevenue>,
    pub total_minutes: i64,
    pub total_cents: i64,
}

/// An entry's amount is `minutes x rate / 60` in cents, rounded half-up.
/// The rate is the entry's own override or the owning project's rate.
fn entry_amount_cents(minutes: i64, rate_cents: i64) -> i64 {
    (minutes * rate_cents + 30) / 60
}

/// Per-client billable revenue. Non-billable and still-running entries
/// contribute nothing; entries whose project is unknown are skipped.
pub fn revenue_by_client(
    clients: &[Client],
    projects: &[Project],
    entries: &[TimeEntry],
) -> RevenueReport {
    let mut rows: Vec<ClientRevenue> = clients
        .iter()
        .map(|c| ClientRevenue {
            client_id: c.id.clone(),
            client_name: c.name.clone(),
            billable_minutes: 0,
            amount_cents: 0,
        })
        .collect();

    for entry in entries {
        if !entry.billable || entry.is_running() {
            continue;
        }
        let Some(project) = projects.iter().find(|p| p.id == entry.project_id) else {
            continue;
        };
        let Some(row) = rows.iter_mut().find(|r| r.client_id == project.client_id) else {
            continue;
        };
        let minutes = entry.duration_minutes(entry.ended_at.unwrap_or(entry.started_at));
        let rate = entry.hourly_rate_cents.unwrap_or(project.hourly_rate_cents);
        row.billable_minutes += minutes;
        row.amount_cents += entry_amount_cents(minutes, rate);
    }

    let total_minutes = rows.iter().map(|r| r.billable_minutes).sum();
    let total_cents = rows.iter().map(|r| r.amount_cents).sum();
    RevenueReport {
        clients: rows,
        total_minutes,
        total_cents,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationReport {
    pub tracked_minutes: i64,
    pub billable_minutes: i64,
    /// Billable share of tracked time, 0 when nothing is tracked.
    pub utilization_pct: f64,
}

pub fn utilization(entries: &[TimeEntry]) -> UtilizationReport {
    let mut tracked = 0i64;
    let mut billable = 0i64;
    for entry in entries {
        if entry.is_running() {
            continue;
        }
        let minutes = entry.duration_minutes(entry.ended_at.unwrap_or(entry.started_at));
        tracked += minutes;
        if entry.billable {
            billable += minutes;
        }
    }
    let utilization_pct = if tracked == 0 {
        0.0
    } else {
        billable as f64 / tracked as f64 * 100.0
    };
    UtilizationReport {
        tracked_minutes: tracked,
        billable_minutes: billable,
        utilization_pct,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProfitability {
    pub project_id: String,
    pub project_name: String,
    pub budget_cents: i64,
    pub billed_cents: i64,
    /// May go negative on overrun.
    pub remaining_cents: i64,
    /// `None` for projects without a budget.
    pub budget_consumed_pct: Option<f64>,
}

pub fn project_profitability(
    projects: &[Project],
    entries: &[TimeEntry],
) -> Vec<ProjectProfitability> {
    projects
        .iter()
        .map(|project| {
            let billed_cents: i64 = entries
                .iter()
                .filter(|e| e.project_id == project.id && e.billable && !e.is_running())
                .map(|e| {
                    let minutes = e.duration_minutes(e.ended_at.unwrap_or(e.started_at));
                    let rate = e.hourly_rate_cents.unwrap_or(project.hourly_rate_cents);
                    entry_amount_cents(minutes, rate)
                })
                .sum();
            let budget_consumed_pct = if project.budget_cents > 0 {
                Some(billed_cents as f64 / project.budget_cents as f64 * 100.0)
            } else {
                None
            };
            ProjectProfitability {
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                budget_cents: project.budget_cents,
                billed_cents,
                remaining_cents: project.budget_cents - billed_cents,
                budget_consumed_pct,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCompletion {
    pub project_id: String,
    pub project_name: String,
    pub total_tasks: i64,
    pub done_tasks: i64,
    /// 0 for projects with no tasks.
    pub completion_pct: f64,
}

pub fn task_completion(projects: &[Project], tasks: &[Task]) -> Vec<ProjectCompletion> {
    projects
        .iter()
        .map(|project| {
            let total = tasks.iter().filter(|t| t.project_id == project.id).count() as i64;
            let done = tasks
                .iter()
                .filter(|t| t.project_id == project.id && t.status == TaskStatus::Done)
                .count() as i64;
            let completion_pct = if total == 0 {
                0.0
            } else {
                done as f64 / total as f64 * 100.0
            };
            ProjectCompletion {
                project_id: project.id.clone(),
                project_name: project.name.clone(),
                total_tasks: total,
                done_tasks: done,
                completion_pct,
            }
        })
        .collect()
}
