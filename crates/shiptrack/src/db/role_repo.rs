//! Role repository: maps identity user ids to employee/admin roles.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw role row from the database.
#[derive(Debug, Clone)]
pub struct RoleRow {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl RoleRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            uid: row.get("uid")?,
            email: row.get("email")?,
            name: row.get("name")?,
            role: row.get("role")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts or replaces the role record of a user.
pub fn upsert(db: &Database, role: &RoleRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO roles (uid, email, name, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(uid) DO UPDATE SET email = excluded.email, name = excluded.name,
             role = excluded.role",
            params![role.uid, role.email, role.name, role.role, role.created_at],
        )?;
        Ok(())
    })
}

/// Finds the role record of a user.
pub fn find_by_uid(db: &Database, uid: &str) -> Result<Option<RoleRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM roles WHERE uid = ?1")?;
        let mut rows = stmt.query_map(params![uid], RoleRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists every role record, oldest first.
pub fn list_all(db: &Database) -> Result<Vec<RoleRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM roles ORDER BY created_at ASC, uid ASC")?;
        let rows = stmt
            .query_map([], RoleRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts role records with the given role.
pub fn count_by_role(db: &Database, role: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM roles WHERE role = ?1",
            params![role],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Deletes a role record. Returns false if there was none.
pub fn delete(db: &Database, uid: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM roles WHERE uid = ?1", params![uid])?;
        Ok(deleted > 0)
    })
}
