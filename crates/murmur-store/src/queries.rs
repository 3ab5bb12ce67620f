use anyhow::Result;
use rusqlite::Connection;

use crate::models::DocumentRow;
use crate::sqlite::Database;

impl Database {
    /// Insert or replace the document under `key`.
    pub fn upsert_document(&self, key: &str, body: &str) -> Result<()> {
        self.with_conn(|conn| upsert_document(conn, key, body))
    }

    pub fn get_documents(&self) -> Result<Vec<DocumentRow>> {
        self.with_conn(query_documents)
    }

    /// Counter that moves whenever another connection commits to the file.
    pub fn data_version(&self) -> Result<i64> {
        self.with_conn(query_data_version)
    }
}

pub(crate) fn upsert_document(conn: &Connection, key: &str, body: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (key, body) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET body = excluded.body, written_at = datetime('now')",
        (key, body),
    )?;
    Ok(())
}

pub(crate) fn query_documents(conn: &Connection) -> Result<Vec<DocumentRow>> {
    let mut stmt = conn.prepare("SELECT key, body, written_at FROM documents")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(DocumentRow {
                key: row.get(0)?,
                body: row.get(1)?,
                written_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub(crate) fn query_data_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
    Ok(version)
}
