//! Shipment history repository: append-only audit entries per shipment.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw history row from the database.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub id: String,
    pub job_number: String,
    pub updated_by: String,
    pub status: String,
    pub description: String,
    pub planning_date: Option<String>,
    pub updated_at: String,
}

impl HistoryRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_number: row.get("job_number")?,
            updated_by: row.get("updated_by")?,
            status: row.get("status")?,
            description: row.get("description")?,
            planning_date: row.get("planning_date")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Appends a history entry. Entries are never updated afterwards.
pub fn append(db: &Database, entry: &HistoryRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO shipment_history (id, job_number, updated_by, status, description,
             planning_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.job_number,
                entry.updated_by,
                entry.status,
                entry.description,
                entry.planning_date,
                entry.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists a shipment's history in creation order. Ties on the timestamp
/// fall back to insertion order.
pub fn list_for_job(db: &Database, job_number: &str) -> Result<Vec<HistoryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM shipment_history WHERE job_number = ?1
             ORDER BY updated_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![job_number], HistoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Returns the newest history entry of a shipment.
pub fn latest_for_job(
    db: &Database,
    job_number: &str,
) -> Result<Option<HistoryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM shipment_history WHERE job_number = ?1
             ORDER BY updated_at DESC, rowid DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![job_number], HistoryRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Deletes every history entry of a shipment, returning how many went.
pub fn delete_for_job(db: &Database, job_number: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM shipment_history WHERE job_number = ?1",
            params![job_number],
        )?;
        Ok(deleted)
    })
}
