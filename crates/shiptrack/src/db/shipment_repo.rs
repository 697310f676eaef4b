//! Shipment repository: CRUD operations for the `shipments` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};
use crate::shipment::normalize_po_number;

/// A raw shipment row from the database.
#[derive(Debug, Clone)]
pub struct ShipmentRow {
    pub job_number: String,
    pub status: String,
    pub description: String,
    pub weight: String,
    pub num_packages: Option<u32>,
    pub po_number: String,
    /// Normalized PO number used for case-insensitive lookups.
    pub po_number_key: String,
    pub transit_point: String,
    pub planning_date: Option<String>,
    pub created_at: String,
    pub last_updated: String,
}

impl ShipmentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            job_number: row.get("job_number")?,
            status: row.get("status")?,
            description: row.get("description")?,
            weight: row.get("weight")?,
            num_packages: row.get("num_packages")?,
            po_number: row.get("po_number")?,
            po_number_key: row.get("po_number_key")?,
            transit_point: row.get("transit_point")?,
            planning_date: row.get("planning_date")?,
            created_at: row.get("created_at")?,
            last_updated: row.get("last_updated")?,
        })
    }
}

/// Fields that may change on every status update.
#[derive(Debug, Clone)]
pub struct TrackingFields<'a> {
    pub status: &'a str,
    pub description: &'a str,
    pub planning_date: Option<&'a str>,
    pub last_updated: &'a str,
}

/// Inserts a new shipment row.
pub fn insert(db: &Database, shipment: &ShipmentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO shipments (job_number, status, description, weight, num_packages,
             po_number, po_number_key, transit_point, planning_date, created_at, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                shipment.job_number,
                shipment.status,
                shipment.description,
                shipment.weight,
                shipment.num_packages,
                shipment.po_number,
                shipment.po_number_key,
                shipment.transit_point,
                shipment.planning_date,
                shipment.created_at,
                shipment.last_updated,
            ],
        )?;
        Ok(())
    })
}

/// Merges the tracking fields into an existing shipment. Creation-only
/// fields are left untouched. Returns false if no such shipment exists.
pub fn update_tracking(
    db: &Database,
    job_number: &str,
    fields: &TrackingFields<'_>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE shipments SET status = ?2, description = ?3, planning_date = ?4,
             last_updated = ?5 WHERE job_number = ?1",
            params![
                job_number,
                fields.status,
                fields.description,
                fields.planning_date,
                fields.last_updated,
            ],
        )?;
        Ok(changed > 0)
    })
}

/// Finds a shipment by its job number (exact, case-sensitive).
pub fn find_by_job_number(
    db: &Database,
    job_number: &str,
) -> Result<Option<ShipmentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM shipments WHERE job_number = ?1")?;
        let mut rows = stmt.query_map(params![job_number], ShipmentRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds shipments by PO number, most recently updated first.
///
/// With `normalized` the value is compared against the stored lookup key,
/// otherwise against the PO number exactly as it was entered.
pub fn find_by_po_number(
    db: &Database,
    value: &str,
    normalized: bool,
) -> Result<Vec<ShipmentRow>, DatabaseError> {
    let sql = if normalized {
        "SELECT * FROM shipments WHERE po_number_key = ?1
         ORDER BY last_updated DESC, job_number ASC"
    } else {
        "SELECT * FROM shipments WHERE po_number = ?1
         ORDER BY last_updated DESC, job_number ASC"
    };

    db.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![value], ShipmentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Rewrites every `po_number_key` from its PO number. Returns how many
/// keys changed.
///
/// Runs as a migration step because SQLite's `lower()` only folds ASCII.
pub(crate) fn recompute_po_number_keys(conn: &Connection) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare("SELECT job_number, po_number, po_number_key FROM shipments")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<(String, String, String)>, _>>()?;

    let mut changed = 0;
    for (job_number, po_number, key) in rows {
        let expected = normalize_po_number(&po_number);
        if expected != key {
            conn.execute(
                "UPDATE shipments SET po_number_key = ?2 WHERE job_number = ?1",
                params![job_number, expected],
            )?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Returns every shipment, most recently updated first.
pub fn list_all(db: &Database) -> Result<Vec<ShipmentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM shipments ORDER BY last_updated DESC, job_number ASC")?;
        let rows = stmt
            .query_map([], ShipmentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a shipment. Its history must already be gone. Returns false if
/// nothing was deleted.
pub fn delete(db: &Database, job_number: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM shipments WHERE job_number = ?1",
            params![job_number],
        )?;
        Ok(deleted > 0)
    })
}
