use rusqlite::Connection;

use crate::DbError;

pub fn run(conn: &Connection) -> Result<(), DbError> {
    // Baseline schema — idempotent CREATE TABLE IF NOT EXISTS
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS clients (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            company     TEXT NOT NULL DEFAULT '',
            email       TEXT NOT NULL,
            phone       TEXT NOT NULL DEFAULT '',
            address     TEXT NOT NULL DEFAULT '',
            notes       TEXT NOT NULL DEFAULT '',
            status      TEXT NOT NULL DEFAULT 'active'
                            CHECK(status IN ('active', 'archived')),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id                TEXT PRIMARY KEY,
            client_id         TEXT NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
            name              TEXT NOT NULL,
            description       TEXT NOT NULL DEFAULT '',
            status            TEXT NOT NULL DEFAULT 'planned'
                                  CHECK(status IN (
                                      'planned', 'active', 'on_hold',
                                      'completed', 'cancelled'
                                  )),
            hourly_rate_cents INTEGER NOT NULL DEFAULT 0,
            budget_cents      INTEGER NOT NULL DEFAULT 0,
            starts_at         TEXT,
            due_at            TEXT,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_projects_client ON projects(client_id);
        CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT PRIMARY KEY,
            project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL DEFAULT '',
            status       TEXT NOT NULL DEFAULT 'todo'
                             CHECK(status IN ('todo', 'in_progress', 'review', 'done')),
            priority     TEXT NOT NULL DEFAULT 'medium'
                             CHECK(priority IN ('low', 'medium', 'high', 'urgent')),
            due_at       TEXT,
            completed_at TEXT,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_status  ON tasks(project_id, status);
        CREATE INDEX IF NOT EXISTS idx_tasks_due     ON tasks(due_at);

        CREATE TABLE IF NOT EXISTS time_entries (
            id                TEXT PRIMARY KEY,
            project_id        TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            task_id           TEXT REFERENCES tasks(id) ON DELETE SET NULL,
            description       TEXT NOT NULL DEFAULT '',
            started_at        TEXT NOT NULL,
            ended_at          TEXT,
            billable          INTEGER NOT NULL DEFAULT 1,
            hourly_rate_cents INTEGER,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_time_entries_project ON time_entries(project_id);
        CREATE INDEX IF NOT EXISTS idx_time_entries_task    ON time_entries(task_id);
        CREATE INDEX IF NOT EXISTS idx_time_entries_started ON time_entries(started_at);

        CREATE TABLE IF NOT EXISTS attachments (
            id           TEXT PRIMARY KEY,
            owner        TEXT NOT NULL CHECK(owner IN ('client', 'project', 'task')),
            owner_id     TEXT NOT NULL,
            filename     TEXT NOT NULL,
            store_key    TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT '',
            size_bytes   INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_attachments_owner ON attachments(owner, owner_id);

        CREATE TABLE IF NOT EXISTS api_keys (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL DEFAULT '',
            key_hash     TEXT NOT NULL UNIQUE,
            created_at   TEXT NOT NULL,
            last_used_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_api_keys_hash ON api_keys(key_hash);
        ",
    )?;

    // Versioned migrations
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        tracing::debug!("applying schema migration v1");
        // v1: task estimates and the notifications table
        // Use a helper to check if column exists before ALTER TABLE
        let has_column = |table: &str, col: &str| -> bool {
            conn.prepare(&format!("SELECT {col} FROM {table} LIMIT 0"))
                .is_ok()
        };

        if !has_column("tasks", "estimated_minutes") {
            conn.execute_batch(
                "ALTER TABLE tasks ADD COLUMN estimated_minutes INTEGER;",
            )?;
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS notifications (
                 id         TEXT PRIMARY KEY,
                 kind       TEXT NOT NULL CHECK(kind IN (
                                'task_due', 'task_overdue', 'timer_reminder', 'system'
                            )),
                 title      TEXT NOT NULL,
                 body       TEXT NOT NULL DEFAULT '',
                 task_id    TEXT REFERENCES tasks(id) ON DELETE CASCADE,
                 read_at    TEXT,
                 created_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_notifications_created
                 ON notifications(created_at);
             CREATE INDEX IF NOT EXISTS idx_notifications_kind_task
                 ON notifications(kind, task_id);",
        )?;

        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (1, datetime('now'))",
            [],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Db;

    #[test]
    fn migrations_are_idempotent() {
        let db = Db::open_in_memory().unwrap();
        // Running again against the same connection must not fail.
        db.with_conn(|conn| {
            super::run(conn)?;
            super::run(conn)?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn schema_version_recorded() {
        let db = Db::open_in_memory().unwrap();
        let version: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT MAX(version) FROM schema_version",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(version, 1);
    }
}
