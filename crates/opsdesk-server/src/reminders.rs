use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use opsdesk_core::notification::{CreateNotification, NotificationKind};
use opsdesk_core::time_entry::format_minutes;
use opsdesk_db::{Db, DbError};

/// How far ahead of a due date the scan warns.
const DUE_SOON_WINDOW_HOURS: i64 = 24;

/// A running timer older than this triggers a reminder.
const LONG_TIMER_HOURS: i64 = 8;

/// Background task that turns due dates and forgotten timers into
/// notifications.
///
/// Runs every `scan_interval_secs` and emits:
/// - `TaskDue` for open tasks due within the next 24 hours
/// - `TaskOverdue` for open tasks past their due date
/// - `TimerReminder` for a running time entry older than 8 hours
///
/// Each (kind, task) pair gets at most one notification ever; the scan
/// skips anything that already has one, read or not.
pub async fn run_reminder_scan(db: Db, scan_interval_secs: u64) {
    info!("reminder scan running every {scan_interval_secs}s");
    let mut ticker = tokio::time::interval(Duration::from_secs(scan_interval_secs));
    loop {
        ticker.tick().await;
        if let Err(e) = scan_once(&db) {
            error!("reminder scan error: {e}");
        }
    }
}

pub fn scan_once(db: &Db) -> Result<(), DbError> {
    let now = Utc::now();
    let soon = now + chrono::Duration::hours(DUE_SOON_WINDOW_HOURS);

    for task in db.list_open_tasks_due_before(soon)? {
        let Some(due) = task.due_at else { continue };
        let (kind, title, body) = if due < now {
            (
                NotificationKind::TaskOverdue,
                format!("Overdue: {}", task.title),
                format!("This task was due {}.", due.format("%Y-%m-%d %H:%M UTC")),
            )
        } else {
            (
                NotificationKind::TaskDue,
                format!("Due soon: {}", task.title),
                format!("This task is due {}.", due.format("%Y-%m-%d %H:%M UTC")),
            )
        };

        if db.has_notification(kind, Some(&task.id))? {
            continue;
        }
        debug!("reminder: {} for task {}", kind.as_str(), task.id);
        db.create_notification(&CreateNotification {
            kind,
            title,
            body,
            task_id: Some(task.id.clone()),
        })?;
    }

    if let Some(entry) = db.active_time_entry()? {
        let elapsed = entry.duration_minutes(now);
        if elapsed >= LONG_TIMER_HOURS * 60
            && !db.has_notification(NotificationKind::TimerReminder, entry.task_id.as_deref())?
        {
            db.create_notification(&CreateNotification {
                kind: NotificationKind::TimerReminder,
                title: "Timer still running".into(),
                body: format!(
                    "A timer has been running for {}. Did you forget to stop it?",
                    format_minutes(elapsed)
                ),
                task_id: entry.task_id.clone(),
            })?;
        }
    }

    Ok(())
}
