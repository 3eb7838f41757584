use chrono::Utc;
use rusqlite::{params, Row};

use opsdesk_core::notification::{
    CreateNotification, Notification, NotificationFilter, NotificationKind,
};

use crate::{Db, DbError};

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let kind_str: String = row.get("kind")?;
    Ok(Notification {
        id: row.get("id")?,
        kind: NotificationKind::parse_str(&kind_str).unwrap_or(NotificationKind::System),
        title: row.get("title")?,
        body: row.get("body")?,
        task_id: row.get("task_id")?,
        read_at: row.get("read_at")?,
        created_at: row.get("created_at")?,
    })
}

impl Db {
    pub fn create_notification(
        &self,
        input: &CreateNotification,
    ) -> Result<Notification, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO notifications (id, kind, title, body, task_id, read_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
                params![
                    id,
                    input.kind.as_str(),
                    input.title,
                    input.body,
                    input.task_id,
                    now
                ],
            )?;
            let notification = conn.query_row(
                "SELECT * FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )?;
            Ok(notification)
        })
    }

    pub fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM notifications WHERE 1=1");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if filter.unread_only {
                sql.push_str(" AND read_at IS NULL");
            }
            if let Some(kind) = filter.kind {
                param_values.push(Box::new(kind.as_str().to_string()));
                sql.push_str(&format!(" AND kind = ?{}", param_values.len()));
            }

            sql.push_str(" ORDER BY created_at DESC");

            if let Some(limit) = filter.limit {
                param_values.push(Box::new(limit));
                sql.push_str(&format!(" LIMIT ?{}", param_values.len()));
            }

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let notifications = stmt
                .query_map(params_ref.as_slice(), row_to_notification)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(notifications)
        })
    }

    pub fn get_notification(&self, id: &str) -> Result<Notification, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("notification {id}"))
                }
                other => DbError::Sqlite(other),
            })
        })
    }

    pub fn unread_notification_count(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE read_at IS NULL",
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// Marking an already-read notification again keeps the original read_at.
    pub fn mark_notification_read(&self, id: &str) -> Result<Notification, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE notifications SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
                params![now, id],
            )?;
            if changed == 0 {
                // Either missing or already read; distinguish with a lookup.
                return conn
                    .query_row(
                        "SELECT * FROM notifications WHERE id = ?1",
                        params![id],
                        row_to_notification,
                    )
                    .map_err(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => {
                            DbError::NotFound(format!("notification {id}"))
                        }
                        other => DbError::Sqlite(other),
                    });
            }
            let notification = conn.query_row(
                "SELECT * FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )?;
            Ok(notification)
        })
    }

    /// Returns how many notifications were newly marked.
    pub fn mark_all_notifications_read(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE notifications SET read_at = ?1 WHERE read_at IS NULL",
                params![now],
            )?;
            Ok(changed as i64)
        })
    }

    pub fn delete_notification(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("notification {id}")));
            }
            Ok(())
        })
    }

    /// Whether a notification of this kind already exists for the task.
    /// `task_id = None` matches rows with a NULL task (timer reminders).
    pub fn has_notification(
        &self,
        kind: NotificationKind,
        task_id: Option<&str>,
    ) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let count: i64 = match task_id {
                Some(task_id) => conn.query_row(
                    "SELECT COUNT(*) FROM notifications WHERE kind = ?1 AND task_id = ?2",
                    params![kind.as_str(), task_id],
                    |r| r.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COUNT(*) FROM notifications WHERE kind = ?1 AND task_id IS NULL",
                    params![kind.as_str()],
                    |r| r.get(0),
                )?,
            };
            Ok(count > 0)
        })
    }
}
