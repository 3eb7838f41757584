use chrono::Utc;
use rusqlite::{params, Row};

use opsdesk_core::client::{Client, ClientFilter, ClientStatus, CreateClient, UpdateClient};
use opsdesk_core::sort::SortDir;

use crate::{Db, DbError};

fn row_to_client(row: &Row) -> rusqlite::Result<Client> {
    let status_str: String = row.get("status")?;
    Ok(Client {
        id: row.get("id")?,
        name: row.get("name")?,
        company: row.get("company")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
        notes: row.get("notes")?,
        status: ClientStatus::parse_str(&status_str).unwrap_or(ClientStatus::Active),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Db {
    pub fn create_client(&self, input: &CreateClient) -> Result<Client, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO clients (id, name, company, email, phone, address, notes, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    input.name,
                    input.company,
                    input.email,
                    input.phone,
                    input.address,
                    input.notes,
                    input.status.as_str(),
                    now,
                    now
                ],
            )?;
            let client = conn.query_row(
                "SELECT * FROM clients WHERE id = ?1",
                params![id],
                row_to_client,
            )?;
            Ok(client)
        })
    }

    pub fn get_client(&self, id: &str) -> Result<Client, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM clients WHERE id = ?1",
                params![id],
                row_to_client,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("client {id}")),
                other => DbError::Sqlite(other),
            })
        })
    }

    pub fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>, DbError> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM clients WHERE 1=1");
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(status) = filter.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sql.push_str(&format!(" AND status = ?{}", param_values.len()));
            }
            if let Some(ref search) = filter.search {
                param_values.push(Box::new(search.to_lowercase()));
                let n = param_values.len();
                sql.push_str(&format!(
                    " AND (instr(LOWER(name), ?{n}) > 0 \
                     OR instr(LOWER(company), ?{n}) > 0 \
                     OR instr(LOWER(email), ?{n}) > 0)"
                ));
            }

            let sort = filter
                .sort_by
                .map(|f| f.sql())
                .unwrap_or("LOWER(name)");
            let dir = filter.sort_dir.unwrap_or(SortDir::Asc);
            sql.push_str(&format!(" ORDER BY {} {}", sort, dir.sql()));

            if let Some(limit) = filter.limit {
                param_values.push(Box::new(limit));
                sql.push_str(&format!(" LIMIT ?{}", param_values.len()));
            }

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let clients = stmt
                .query_map(params_ref.as_slice(), row_to_client)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(clients)
        })
    }

    pub fn update_client(&self, id: &str, update: &UpdateClient) -> Result<Client, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let mut sets = vec!["updated_at = ?1".to_string()];
            let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(now)];

            if let Some(ref name) = update.name {
                param_values.push(Box::new(name.clone()));
                sets.push(format!("name = ?{}", param_values.len()));
            }
            if let Some(ref company) = update.company {
                param_values.push(Box::new(company.clone()));
                sets.push(format!("company = ?{}", param_values.len()));
            }
            if let Some(ref email) = update.email {
                param_values.push(Box::new(email.clone()));
                sets.push(format!("email = ?{}", param_values.len()));
            }
            if let Some(ref phone) = update.phone {
                param_values.push(Box::new(phone.clone()));
                sets.push(format!("phone = ?{}", param_values.len()));
            }
            if let Some(ref address) = update.address {
                param_values.push(Box::new(address.clone()));
                sets.push(format!("address = ?{}", param_values.len()));
            }
            if let Some(ref notes) = update.notes {
                param_values.push(Box::new(notes.clone()));
                sets.push(format!("notes = ?{}", param_values.len()));
            }
            if let Some(status) = update.status {
                param_values.push(Box::new(status.as_str().to_string()));
                sets.push(format!("status = ?{}", param_values.len()));
            }

            param_values.push(Box::new(id.to_string()));
            let sql = format!(
                "UPDATE clients SET {} WHERE id = ?{}",
                sets.join(", "),
                param_values.len()
            );

            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let changed = conn.execute(&sql, params_ref.as_slice())?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("client {id}")));
            }

            let client = conn.query_row(
                "SELECT * FROM clients WHERE id = ?1",
                params![id],
                row_to_client,
            )?;
            Ok(client)
        })
    }

    pub fn delete_client(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("client {id}")));
            }
            Ok(())
        })
    }

    pub fn count_active_clients(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM clients WHERE status = 'active'",
                [],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_core::client::ClientSortField;

    fn input(name: &str, company: &str, status: ClientStatus) -> CreateClient {
        CreateClient {
            name: name.into(),
            company: company.into(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
            status,
        }
    }

    #[test]
    fn client_crud() {
        let db = Db::open_in_memory().unwrap();

        let client = db
            .create_client(&input("Acme Corp", "Acme", ClientStatus::Active))
            .unwrap();
        assert_eq!(client.name, "Acme Corp");
        assert_eq!(client.status, ClientStatus::Active);

        let fetched = db.get_client(&client.id).unwrap();
        assert_eq!(fetched.id, client.id);

        let updated = db
            .update_client(
                &client.id,
                &UpdateClient {
                    status: Some(ClientStatus::Archived),
                    notes: Some("churned".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, ClientStatus::Archived);
        assert_eq!(updated.notes, "churned");

        db.delete_client(&client.id).unwrap();
        assert!(matches!(
            db.get_client(&client.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn list_filters_conjunctively() {
        let db = Db::open_in_memory().unwrap();
        db.create_client(&input("Acme Corp", "Acme", ClientStatus::Active))
            .unwrap();
        db.create_client(&input("Beta LLC", "Beta", ClientStatus::Active))
            .unwrap();
        db.create_client(&input("Acme Legacy", "Acme", ClientStatus::Archived))
            .unwrap();

        let active = db
            .list_clients(&ClientFilter {
                status: Some(ClientStatus::Active),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 2);

        let both = db
            .list_clients(&ClientFilter {
                status: Some(ClientStatus::Active),
                search: Some("ACME".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "Acme Corp");
    }

    #[test]
    fn search_matches_company_and_email() {
        let db = Db::open_in_memory().unwrap();
        db.create_client(&input("Jane Doe", "Widgets Inc", ClientStatus::Active))
            .unwrap();

        let by_company = db
            .list_clients(&ClientFilter {
                search: Some("widgets".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_company.len(), 1);

        let by_email = db
            .list_clients(&ClientFilter {
                search: Some("jane.doe@".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_email.len(), 1);
    }

    #[test]
    fn sort_direction_reverses_listing() {
        let db = Db::open_in_memory().unwrap();
        for name in ["Charlie", "Alpha", "Bravo"] {
            db.create_client(&input(name, "", ClientStatus::Active))
                .unwrap();
        }

        let asc = db
            .list_clients(&ClientFilter {
                sort_by: Some(ClientSortField::Name),
                sort_dir: Some(SortDir::Asc),
                ..Default::default()
            })
            .unwrap();
        let desc = db
            .list_clients(&ClientFilter {
                sort_by: Some(ClientSortField::Name),
                sort_dir: Some(SortDir::Desc),
                ..Default::default()
            })
            .unwrap();

        let asc_names: Vec<_> = asc.iter().map(|c| c.name.clone()).collect();
        let mut desc_names: Vec<_> = desc.iter().map(|c| c.name.clone()).collect();
        desc_names.reverse();
        assert_eq!(asc_names, vec!["Alpha", "Bravo", "Charlie"]);
        assert_eq!(asc_names, desc_names);
    }

    #[test]
    fn count_active_ignores_archived() {
        let db = Db::open_in_memory().unwrap();
        db.create_client(&input("A", "", ClientStatus::Active)).unwrap();
        db.create_client(&input("B", "", ClientStatus::Archived))
            .unwrap();
        assert_eq!(db.count_active_clients().unwrap(), 1);
    }
}
