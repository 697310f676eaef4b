//! Account repository: credentials for the local identity provider.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw account row from the database.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub uid: String,
    /// Lowercased email address.
    pub email: String,
    /// PHC-encoded hash; the salt is part of the string.
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            uid: row.get("uid")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new account row.
pub fn insert(db: &Database, account: &AccountRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO accounts (uid, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.uid,
                account.email,
                account.password_hash,
                account.created_at,
                account.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds an account by its (lowercased) email.
pub fn find_by_email(db: &Database, email: &str) -> Result<Option<AccountRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM accounts WHERE email = ?1")?;
        let mut rows = stmt.query_map(params![email], AccountRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds an account by uid.
pub fn find_by_uid(db: &Database, uid: &str) -> Result<Option<AccountRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM accounts WHERE uid = ?1")?;
        let mut rows = stmt.query_map(params![uid], AccountRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Replaces the password hash of an account.
pub fn update_password(
    db: &Database,
    uid: &str,
    password_hash: &str,
    updated_at: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE accounts SET password_hash = ?2, updated_at = ?3
             WHERE uid = ?1",
            params![uid, password_hash, updated_at],
        )?;
        Ok(changed > 0)
    })
}
