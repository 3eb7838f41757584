use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use opsdesk_core::sort::SortDir;
use opsdesk_core::time_entry::{
    CreateTimeEntry, StartTimer, TimeEntry, TimeEntryFilter, UpdateTimeEntry,
};

use crate::{Db, DbError};

fn row_to_entry(row: &Row) -> rusqlite::Result<TimeEntry> {
    Ok(TimeEntry {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        task_id: row.get("task_id")?,
        description: row.get("description")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        billable: row.get("billable")?,
        hourly_rate_cents: row.get("hourly_rate_cents")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Db {
    pub fn create_time_entry(&self, input: &CreateTimeEntry) -> Result<TimeEntry, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO time_entries (
                    id, project_id, task_id, description, started_at, ended_at,
                    billable, hourly_rate_cents, created_at, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    input.project_id,
                    input.task_id,
                    input.description,
                    input.started_at,
                    input.ended_at,
                    input.billable,
                    input.hourly_rate_cents,
                    now,
                    now
                ],
            )?;
            let entry = conn.query_row(
                "SELECT * FROM time_entries WHERE id = ?1",
                params![id],
                row_to_entry,
            )?;
            Ok(entry)
        })
    }

    /// Insert a running entry (the stopwatch). The caller enforces the
    /// single-running-timer invariant.
    pub fn start_time_entry(&self, input: &StartTimer) -> Result<TimeEntry, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO time_entries (
                    id, project_id, task_id, description, started_at, ended_at,
                    billable, hourly_rate_cents, created_at, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, NULL, ?7, ?8)",
                params![
                    id,
                    input.project_id,
                    input.task_id,
                    input.description,
                    now,
                    input.billable,
                    now,
                    now
                ],
            )?;
            let entry = conn.query_row(
                "SELECT * FROM time_entries WHERE id = ?1",
                params![id],
                row_to_entry,
            )?;
            Ok(entry)
        })
    }

    pub fn get_time_entry(&self, id: &str) -> Result<TimeEntry, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM time_entries WHERE id = ?1",
                params![id],
                row_to_entry,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("time entry {id}"))
                }
                other => DbError::Sqlite(other),
            })
        })
    }

    pub fn list_time_entries(&self, filter: &TimeEntryFilter) -> Result<Vec<TimeEntry>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM time_entries WHERE 1=1");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(ref project_id) = filter.project_id {
                param_values.push(Box::new(project_id.clone()));
                sql.push_str(&format!(" AND project_id = ?{}", param_values.len()));
            }
            if let Some(ref task_id) = filter.task_id {
                param_values.push(Box::new(task_id.clone()));
                sql.push_str(&format!(" AND task_id = ?{}", param_values.len()));
            }
            if let Some(billable) = filter.billable {
                param_values.push(Box::new(billable));
                sql.push_str(&format!(" AND billable = ?{}", param_values.len()));
            }
            if let Some(since) = filter.since {
                param_values.push(Box::new(since));
                sql.push_str(&format!(" AND started_at >= ?{}", param_values.len()));
            }
            if let Some(until) = filter.until {
                param_values.push(Box::new(until));
                sql.push_str(&format!(" AND started_at < ?{}", param_values.len()));
            }
            if let Some(running) = filter.running {
                if running {
                    sql.push_str(" AND ended_at IS NULL");
                } else {
                    sql.push_str(" AND ended_at IS NOT NULL");
                }
            }

            let dir = filter.sort_dir.unwrap_or(SortDir::Desc);
            sql.push_str(&format!(" ORDER BY started_at {}", dir.sql()));

            if let Some(limit) = filter.limit {
                param_values.push(Box::new(limit));
                sql.push_str(&format!(" LIMIT ?{}", param_values.len()));
            }

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params_ref.as_slice(), row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    pub fn update_time_entry(
        &self,
        id: &str,
        update: &UpdateTimeEntry,
    ) -> Result<TimeEntry, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let mut sets = vec!["updated_at = ?1".to_string()];
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

            if let Some(ref task_id) = update.task_id {
                param_values.push(Box::new(task_id.clone()));
                sets.push(format!("task_id = ?{}", param_values.len()));
            }
            if let Some(ref description) = update.description {
                param_values.push(Box::new(description.clone()));
                sets.push(format!("description = ?{}", param_values.len()));
            }
            if let Some(started_at) = update.started_at {
                param_values.push(Box::new(started_at));
                sets.push(format!("started_at = ?{}", param_values.len()));
            }
            if let Some(ref ended_at) = update.ended_at {
                param_values.push(Box::new(*ended_at));
                sets.push(format!("ended_at = ?{}", param_values.len()));
            }
            if let Some(billable) = update.billable {
                param_values.push(Box::new(billable));
                sets.push(format!("billable = ?{}", param_values.len()));
            }
            if let Some(ref rate) = update.hourly_rate_cents {
                param_values.push(Box::new(*rate));
                sets.push(format!("hourly_rate_cents = ?{}", param_values.len()));
            }

            param_values.push(Box::new(id.to_string()));
            let sql = format!(
                "UPDATE time_entries SET {} WHERE id = ?{}",
                sets.join(", "),
                param_values.len()
            );

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let changed = conn.execute(&sql, params_ref.as_slice())?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("time entry {id}")));
            }

            let entry = conn.query_row(
                "SELECT * FROM time_entries WHERE id = ?1",
                params![id],
                row_to_entry,
            )?;
            Ok(entry)
        })
    }

    pub fn delete_time_entry(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM time_entries WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("time entry {id}")));
            }
            Ok(())
        })
    }

    /// The running entry, if any. The service keeps at most one.
    pub fn active_time_entry(&self) -> Result<Option<TimeEntry>, DbError> {
        self.with_conn(|conn| {
            let entry = conn
                .query_row(
                    "SELECT * FROM time_entries WHERE ended_at IS NULL
                     ORDER BY started_at DESC LIMIT 1",
                    [],
                    row_to_entry,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(entry)
        })
    }

    /// Total and billable finished minutes for entries started in
    /// `[since, until)`, floored per entry.
    pub fn sum_minutes_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<(i64, i64), DbError> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "SELECT
                    COALESCE(SUM(CAST((julianday(ended_at) - julianday(started_at)) * 1440 AS INTEGER)), 0),
                    COALESCE(SUM(CASE WHEN billable THEN
                        CAST((julianday(ended_at) - julianday(started_at)) * 1440 AS INTEGER)
                        ELSE 0 END), 0)
                 FROM time_entries
                 WHERE ended_at IS NOT NULL AND started_at >= ?1 AND started_at < ?2",
                params![since, until],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
            )?;
            Ok(row)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use opsdesk_core::client::{ClientStatus, CreateClient};
    use opsdesk_core::project::{CreateProject, ProjectStatus};

    fn setup() -> (Db, String) {
        let db = Db::open_in_memory().unwrap();
        let client = db
            .create_client(&CreateClient {
                name: "Acme".into(),
                email: "acme@example.com".into(),
                company: String::new(),
                phone: String::new(),
                address: String::new(),
                notes: String::new(),
                status: ClientStatus::Active,
            })
            .unwrap();
        let project = db
            .create_project(&CreateProject {
                client_id: client.id,
                name: "Site".into(),
                description: String::new(),
                status: ProjectStatus::Active,
                hourly_rate_cents: 6000,
                budget_cents: 0,
                starts_at: None,
                due_at: None,
            })
            .unwrap();
        (db, project.id)
    }

    fn finished(project_id: &str, minutes: i64, billable: bool) -> CreateTimeEntry {
        let now = Utc::now();
        CreateTimeEntry {
            project_id: project_id.into(),
            task_id: None,
            description: String::new(),
            started_at: now - Duration::minutes(minutes),
            ended_at: Some(now),
            billable,
            hourly_rate_cents: None,
        }
    }

    #[test]
    fn entry_crud() {
        let (db, project_id) = setup();

        let entry = db.create_time_entry(&finished(&project_id, 60, true)).unwrap();
        assert!(!entry.is_running());

        let updated = db
            .update_time_entry(
                &entry.id,
                &UpdateTimeEntry {
                    description: Some("code review".into()),
                    billable: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.description, "code review");
        assert!(!updated.billable);

        db.delete_time_entry(&entry.id).unwrap();
        assert!(db.get_time_entry(&entry.id).is_err());
    }

    #[test]
    fn active_entry_is_the_running_one() {
        let (db, project_id) = setup();
        assert!(db.active_time_entry().unwrap().is_none());

        db.create_time_entry(&finished(&project_id, 30, true)).unwrap();
        let started = db
            .start_time_entry(&StartTimer {
                project_id: project_id.clone(),
                task_id: None,
                description: "focus block".into(),
                billable: true,
            })
            .unwrap();

        let active = db.active_time_entry().unwrap().unwrap();
        assert_eq!(active.id, started.id);
        assert!(active.is_running());

        // Stopping by patching ended_at clears the active slot.
        db.update_time_entry(
            &started.id,
            &UpdateTimeEntry {
                ended_at: Some(Some(Utc::now())),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(db.active_time_entry().unwrap().is_none());
    }

    #[test]
    fn running_filter() {
        let (db, project_id) = setup();
        db.create_time_entry(&finished(&project_id, 30, true)).unwrap();
        db.start_time_entry(&StartTimer {
            project_id: project_id.clone(),
            task_id: None,
            description: String::new(),
            billable: false,
        })
        .unwrap();

        let running = db
            .list_time_entries(&TimeEntryFilter {
                running: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(running.len(), 1);

        let done = db
            .list_time_entries(&TimeEntryFilter {
                running: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(done.len(), 1);
    }

    #[test]
    fn sum_minutes_splits_billable() {
        let (db, project_id) = setup();
        db.create_time_entry(&finished(&project_id, 90, true)).unwrap();
        db.create_time_entry(&finished(&project_id, 30, false)).unwrap();
        // Running entries are excluded.
        db.start_time_entry(&StartTimer {
            project_id: project_id.clone(),
            task_id: None,
            description: String::new(),
            billable: true,
        })
        .unwrap();

        let now = Utc::now();
        let (total, billable) = db
            .sum_minutes_between(now - Duration::days(1), now + Duration::days(1))
            .unwrap();
        // julianday arithmetic can land a minute short of the nominal span.
        assert!((119..=120).contains(&total), "total = {total}");
        assert!((89..=90).contains(&billable), "billable = {billable}");
    }

    #[test]
    fn date_window_filter() {
        let (db, project_id) = setup();
        let now = Utc::now();
        // Entry started 3 days ago.
        db.create_time_entry(&CreateTimeEntry {
            started_at: now - Duration::days(3),
            ended_at: Some(now - Duration::days(3) + Duration::hours(1)),
            ..finished(&project_id, 0, true)
        })
        .unwrap();
        db.create_time_entry(&finished(&project_id, 30, true)).unwrap();

        let recent = db
            .list_time_entries(&TimeEntryFilter {
                since: Some(now - Duration::days(1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(recent.len(), 1);
    }
}
