use chrono::Utc;
use rusqlite::{params, Row};

use opsdesk_core::attachment::{Attachment, AttachmentOwner, CreateAttachment};

use crate::{Db, DbError};

fn row_to_attachment(row: &Row) -> rusqlite::Result<Attachment> {
    let owner_str: String = row.get("owner")?;
    Ok(Attachment {
        id: row.get("id")?,
        owner: AttachmentOwner::parse_str(&owner_str).unwrap_or(AttachmentOwner::Task),
        owner_id: row.get("owner_id")?,
        filename: row.get("filename")?,
        store_key: row.get("store_key")?,
        content_type: row.get("content_type")?,
        size_bytes: row.get("size_bytes")?,
        created_at: row.get("created_at")?,
    })
}

impl Db {
    /// Insert with the attachment id chosen up front so the store key can
    /// embed it before the row exists.
    pub fn create_attachment_with_id(
        &self,
        id: &str,
        input: &CreateAttachment,
        store_key: &str,
    ) -> Result<Attachment, DbError> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO attachments (
                    id, owner, owner_id, filename, store_key, content_type,
                    size_bytes, created_at
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    input.owner.as_str(),
                    input.owner_id,
                    input.filename,
                    store_key,
                    input.content_type,
                    input.size_bytes,
                    now
                ],
            )?;
            let attachment = conn.query_row(
                "SELECT * FROM attachments WHERE id = ?1",
                params![id],
                row_to_attachment,
            )?;
            Ok(attachment)
        })
    }

    pub fn list_attachments(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
    ) -> Result<Vec<Attachment>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM attachments WHERE owner = ?1 AND owner_id = ?2
                 ORDER BY created_at DESC",
            )?;
            let attachments = stmt
                .query_map(params![owner.as_str(), owner_id], row_to_attachment)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(attachments)
        })
    }

    pub fn get_attachment(&self, id: &str) -> Result<Attachment, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM attachments WHERE id = ?1",
                params![id],
                row_to_attachment,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("attachment {id}"))
                }
                other => DbError::Sqlite(other),
            })
        })
    }

    /// Delete and return the row so the caller can remove the blob.
    pub fn delete_attachment(&self, id: &str) -> Result<Attachment, DbError> {
        self.with_conn(|conn| {
            let attachment = conn
                .query_row(
                    "SELECT * FROM attachments WHERE id = ?1",
                    params![id],
                    row_to_attachment,
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => {
                        DbError::NotFound(format!("attachment {id}"))
                    }
                    other => DbError::Sqlite(other),
                })?;
            conn.execute("DELETE FROM attachments WHERE id = ?1", params![id])?;
            Ok(attachment)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(owner: AttachmentOwner, owner_id: &str, filename: &str) -> CreateAttachment {
        CreateAttachment {
            owner,
            owner_id: owner_id.into(),
            filename: filename.into(),
            content_type: "application/pdf".into(),
            size_bytes: 1024,
        }
    }

    #[test]
    fn attachment_crud() {
        let db = Db::open_in_memory().unwrap();

        let att = db
            .create_attachment_with_id(
                "att-1",
                &input(AttachmentOwner::Client, "c-1", "contract.pdf"),
                "clients/c-1/attachments/att-1/contract.pdf",
            )
            .unwrap();
        assert_eq!(att.id, "att-1");
        assert_eq!(att.owner, AttachmentOwner::Client);
        assert_eq!(att.filename, "contract.pdf");

        let listed = db
            .list_attachments(AttachmentOwner::Client, "c-1")
            .unwrap();
        assert_eq!(listed.len(), 1);

        let deleted = db.delete_attachment(&att.id).unwrap();
        assert_eq!(
            deleted.store_key,
            "clients/c-1/attachments/att-1/contract.pdf"
        );
        assert!(db.get_attachment(&att.id).is_err());
    }

    #[test]
    fn listing_is_scoped_to_owner() {
        let db = Db::open_in_memory().unwrap();
        db.create_attachment_with_id("att-1", &input(AttachmentOwner::Task, "t-1", "a.png"), "k1")
            .unwrap();
        db.create_attachment_with_id("att-2", &input(AttachmentOwner::Task, "t-2", "b.png"), "k2")
            .unwrap();
        db.create_attachment_with_id(
            "att-3",
            &input(AttachmentOwner::Project, "t-1", "c.png"),
            "k3",
        )
        .unwrap();

        let listed = db.list_attachments(AttachmentOwner::Task, "t-1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "a.png");
    }
}
