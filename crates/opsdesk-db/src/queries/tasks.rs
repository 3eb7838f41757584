use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use opsdesk_core::sort::SortDir;
use opsdesk_core::task::{
    CreateTask, Priority, Task, TaskFilter, TaskStatus, UpdateTask,
};

use crate::{Db, DbError};

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let status_str: String = row.get("status")?;
    let priority_str: String = row.get("priority")?;
    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: TaskStatus::parse_str(&status_str).unwrap_or(TaskStatus::Todo),
        priority: Priority::parse_str(&priority_str).unwrap_or(Priority::Medium),
        due_at: row.get("due_at")?,
        estimated_minutes: row.get("estimated_minutes")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Db {
    pub fn create_task(&self, input: &CreateTask) -> Result<Task, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO tasks (
                    id, project_id, title, description, status, priority,
                    due_at, estimated_minutes, created_at, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    input.project_id,
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority.as_str(),
                    input.due_at,
                    input.estimated_minutes,
                    now,
                    now
                ],
            )?;
            let task = conn.query_row(
                "SELECT * FROM tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )?;
            Ok(task)
        })
    }

    pub fn get_task(&self, id: &str) -> Result<Task, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("task {id}")),
                other => DbError::Sqlite(other),
            })
        })
    }

    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(ref project_id) = filter.project_id {
                param_values.push(Box::new(project_id.clone()));
                sql.push_str(&format!(" AND project_id = ?{}", param_values.len()));
            }
            if let Some(status) = filter.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sql.push_str(&format!(" AND status = ?{}", param_values.len()));
            }
            if let Some(priority) = filter.priority {
                param_values.push(Box::new(priority.as_str().to_string()));
                sql.push_str(&format!(" AND priority = ?{}", param_values.len()));
            }
            if let Some(due_before) = filter.due_before {
                param_values.push(Box::new(due_before));
                sql.push_str(&format!(
                    " AND due_at IS NOT NULL AND due_at < ?{}",
                    param_values.len()
                ));
            }
            if let Some(ref search) = filter.search {
                param_values.push(Box::new(search.to_lowercase()));
                let n = param_values.len();
                sql.push_str(&format!(
                    " AND (instr(LOWER(title), ?{n}) > 0 \
                     OR instr(LOWER(description), ?{n}) > 0)"
                ));
            }

            let sort = filter
                .sort_by
                .map(|f| f.sql())
                .unwrap_or("created_at");
            let dir = filter.sort_dir.unwrap_or(SortDir::Desc);
            sql.push_str(&format!(" ORDER BY {} {}", sort, dir.sql()));

            if let Some(limit) = filter.limit {
                param_values.push(Box::new(limit));
                sql.push_str(&format!(" LIMIT ?{}", param_values.len()));
            }

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_ref.as_slice(), row_to_task)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    pub fn update_task(&self, id: &str, update: &UpdateTask) -> Result<Task, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let mut sets = vec!["updated_at = ?1".to_string()];
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

            if let Some(ref title) = update.title {
                param_values.push(Box::new(title.clone()));
                sets.push(format!("title = ?{}", param_values.len()));
            }
            if let Some(ref description) = update.description {
                param_values.push(Box::new(description.clone()));
                sets.push(format!("description = ?{}", param_values.len()));
            }
            if let Some(status) = update.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sets.push(format!("status = ?{}", param_values.len()));
            }
            if let Some(priority) = update.priority {
                param_values.push(Box::new(priority.as_str().to_string()));
                sets.push(format!("priority = ?{}", param_values.len()));
            }
            if let Some(ref due_at) = update.due_at {
                param_values.push(Box::new(*due_at));
                sets.push(format!("due_at = ?{}", param_values.len()));
            }
            if let Some(ref est) = update.estimated_minutes {
                param_values.push(Box::new(*est));
                sets.push(format!("estimated_minutes = ?{}", param_values.len()));
            }
            if let Some(ref completed_at) = update.completed_at {
                param_values.push(Box::new(*completed_at));
                sets.push(format!("completed_at = ?{}", param_values.len()));
            }

            param_values.push(Box::new(id.to_string()));
            let sql = format!(
                "UPDATE tasks SET {} WHERE id = ?{}",
                sets.join(", "),
                param_values.len()
            );

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let changed = conn.execute(&sql, params_ref.as_slice())?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("task {id}")));
            }

            let task = conn.query_row(
                "SELECT * FROM tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )?;
            Ok(task)
        })
    }

    pub fn delete_task(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    pub fn count_tasks_by_status(&self, project_id: &str) -> Result<Vec<(String, i64)>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) as cnt FROM tasks
                 WHERE project_id = ?1 GROUP BY status",
            )?;
            let counts = stmt
                .query_map(params![project_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts)
        })
    }

    pub fn count_open_tasks(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE status != 'done'",
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn count_overdue_tasks(&self, now: DateTime<Utc>) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM tasks
                 WHERE status != 'done' AND due_at IS NOT NULL AND due_at < ?1",
                params![now],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// Open tasks (not done) with a due date before `threshold`. Used by the
    /// reminder scan.
    pub fn list_open_tasks_due_before(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Task>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks
                 WHERE status != 'done' AND due_at IS NOT NULL AND due_at < ?1
                 ORDER BY due_at ASC",
            )?;
            let tasks = stmt
                .query_map(params![threshold], row_to_task)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }
}
