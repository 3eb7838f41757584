use chrono::Utc;
use rusqlite::{params, Row};

use opsdesk_core::project::{
    CreateProject, Project, ProjectFilter, ProjectStatus, UpdateProject,
};
use opsdesk_core::sort::SortDir;

use crate::{Db, DbError};

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    let status_str: String = row.get("status")?;
    Ok(Project {
        id: row.get("id")?,
        client_id: row.get("client_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status: ProjectStatus::parse_str(&status_str).unwrap_or(ProjectStatus::Planned),
        hourly_rate_cents: row.get("hourly_rate_cents")?,
        budget_cents: row.get("budget_cents")?,
        starts_at: row.get("starts_at")?,
        due_at: row.get("due_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Db {
    pub fn create_project(&self, input: &CreateProject) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO projects (
                    id, client_id, name, description, status,
                    hourly_rate_cents, budget_cents, starts_at, due_at,
                    created_at, updated_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id,
                    input.client_id,
                    input.name,
                    input.description,
                    input.status.as_str(),
                    input.hourly_rate_cents,
                    input.budget_cents,
                    input.starts_at,
                    input.due_at,
                    now,
                    now
                ],
            )?;
            let project = conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )?;
            Ok(project)
        })
    }

    pub fn get_project(&self, id: &str) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("project {id}")),
                other => DbError::Sqlite(other),
            })
        })
    }

    pub fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM projects WHERE 1=1");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(ref client_id) = filter.client_id {
                param_values.push(Box::new(client_id.clone()));
                sql.push_str(&format!(" AND client_id = ?{}", param_values.len()));
            }
            if let Some(status) = filter.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sql.push_str(&format!(" AND status = ?{}", param_values.len()));
            }
            if let Some(ref search) = filter.search {
                param_values.push(Box::new(search.to_lowercase()));
                let n = param_values.len();
                sql.push_str(&format!(
                    " AND (instr(LOWER(name), ?{n}) > 0 \
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
            let projects = stmt
                .query_map(params_ref.as_slice(), row_to_project)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }

    pub fn update_project(&self, id: &str, update: &UpdateProject) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let mut sets = vec!["updated_at = ?1".to_string()];
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

            if let Some(ref name) = update.name {
                param_values.push(Box::new(name.clone()));
                sets.push(format!("name = ?{}", param_values.len()));
            }
            if let Some(ref description) = update.description {
                param_values.push(Box::new(description.clone()));
                sets.push(format!("description = ?{}", param_values.len()));
            }
            if let Some(status) = update.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sets.push(format!("status = ?{}", param_values.len()));
            }
            if let Some(rate) = update.hourly_rate_cents {
                param_values.push(Box::new(rate));
                sets.push(format!("hourly_rate_cents = ?{}", param_values.len()));
            }
            if let Some(budget) = update.budget_cents {
                param_values.push(Box::new(budget));
                sets.push(format!("budget_cents = ?{}", param_values.len()));
            }
            if let Some(ref starts_at) = update.starts_at {
                param_values.push(Box::new(*starts_at));
                sets.push(format!("starts_at = ?{}", param_values.len()));
            }
            if let Some(ref due_at) = update.due_at {
                param_values.push(Box::new(*due_at));
                sets.push(format!("due_at = ?{}", param_values.len()));
            }

            param_values.push(Box::new(id.to_string()));
            let sql = format!(
                "UPDATE projects SET {} WHERE id = ?{}",
                sets.join(", "),
                param_values.len()
            );

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let changed = conn.execute(&sql, params_ref.as_slice())?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("project {id}")));
            }

            let project = conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )?;
            Ok(project)
        })
    }

    pub fn delete_project(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("project {id}")));
            }
            Ok(())
        })
    }

    pub fn count_active_projects(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM projects WHERE status = 'active'",
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }
}
