//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies
//! pending ones in order. Column additions are handled conditionally
//! so that a partially migrated file can be reopened.

use rusqlite::Connection;

use super::error::DatabaseError;
use super::shipment_repo;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
    kind: MigrationKind,
}

enum MigrationKind {
    /// Execute the SQL directly.
    Standard,
    /// ALTER TABLE ADD COLUMN; skip if column already exists.
    AddColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Data fix written in Rust; `sql` is unused. Returns rows touched.
    Backfill(fn(&Connection) -> Result<usize, DatabaseError>),
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_shipments_table",
        sql: include_str!("sql/001_create_shipments.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 2,
        description: "create_shipment_history_table",
        sql: include_str!("sql/002_create_shipment_history.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 3,
        description: "create_accounts_and_roles_tables",
        sql: include_str!("sql/003_create_accounts_and_roles.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 4,
        description: "add_po_number_key_to_shipments",
        sql: include_str!("sql/004_add_po_number_key.sql"),
        kind: MigrationKind::AddColumn {
            table: "shipments",
            column: "po_number_key",
        },
    },
    Migration {
        version: 5,
        description: "drop_password_salt_from_accounts",
        sql: include_str!("sql/005_drop_password_salt.sql"),
        kind: MigrationKind::Standard,
    },
    Migration {
        version: 6,
        description: "recompute_po_number_keys",
        sql: "",
        kind: MigrationKind::Backfill(shipment_repo::recompute_po_number_keys),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        let should_run = match &migration.kind {
            MigrationKind::Standard => true,
            MigrationKind::AddColumn { table, column } => !column_exists(conn, table, column)?,
            MigrationKind::Backfill(run) => {
                let touched = run(conn).map_err(|e| DatabaseError::Migration {
                    version: migration.version,
                    reason: e.to_string(),
                })?;
                log::info!("Migration v{} updated {} rows", migration.version, touched);
                false
            }
        };

        if should_run {
            conn.execute_batch(migration.sql)
                .map_err(|e| DatabaseError::Migration {
                    version: migration.version,
                    reason: e.to_string(),
                })?;
        } else if matches!(migration.kind, MigrationKind::AddColumn { .. }) {
            log::info!(
                "Skipping migration v{} (column already present)",
                migration.version
            );
        }

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}

/// Checks whether a column exists on a table using `PRAGMA table_info`.
fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    // Identifiers are interpolated, so only alphanumerics and underscores.
    if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DatabaseError::Migration {
            version: 0,
            reason: format!("Invalid table name: {}", table),
        });
    }
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .any(|r| r.map(|name| name == column).unwrap_or(false));
    Ok(exists)
}
