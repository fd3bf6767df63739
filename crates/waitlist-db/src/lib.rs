//! # waitlist-db
//!
//! Database access layer for the waitlist.
//! Manages the single SQLite database at `$WAITLIST_DATA_DIR/waitlist.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds
//! - Schema version stored in `PRAGMA user_version`
//! - Positions come from the single-row `position_sequence` table, never
//!   from `MAX(position)`

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    /// Holds the constrained columns, e.g. `entrants.email`.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A write that must affect a row affected none.
    #[error("no rows written: {0}")]
    NoRowsWritten(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// Whether this is a uniqueness violation involving `column`
    /// (`table.column` form).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        match self {
            DbError::UniqueViolation(columns) => columns.split(", ").any(|c| c == column),
            _ => false,
        }
    }

    /// Whether the store was busy or locked rather than rejecting the data.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Map a write error, splitting constraint failures out of `Sqlite`.
pub(crate) fn classify(err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(ref failure, Some(ref msg)) = err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            // "UNIQUE constraint failed: entrants.email"
            let target = msg
                .split_once(": ")
                .map(|(_, t)| t.to_string())
                .unwrap_or_else(|| msg.clone());
            return match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => DbError::UniqueViolation(target),
                _ => DbError::Constraint(target),
            };
        }
    }
    DbError::Sqlite(err)
}

/// Map `QueryReturnedNoRows` to [`DbError::NotFound`].
pub(crate) fn not_found(what: &str) -> impl FnOnce(rusqlite::Error) -> DbError + '_ {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what.to_string()),
        other => DbError::Sqlite(other),
    }
}

/// Open or create the waitlist database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_memory().expect("open");
        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("get foreign_keys");
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_classify_unique_violation() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch("CREATE TABLE t (a TEXT UNIQUE, b INTEGER CHECK (b > 0));")
            .expect("create");
        conn.execute("INSERT INTO t (a, b) VALUES ('x', 1)", [])
            .expect("insert");

        let dup = conn
            .execute("INSERT INTO t (a, b) VALUES ('x', 2)", [])
            .map_err(classify)
            .expect_err("duplicate");
        assert!(dup.is_unique_violation_on("t.a"));
        assert!(!dup.is_unique_violation_on("t.b"));

        let check = conn
            .execute("INSERT INTO t (a, b) VALUES ('y', 0)", [])
            .map_err(classify)
            .expect_err("check");
        assert!(matches!(check, DbError::Constraint(_)));
        assert!(!check.is_transient());
    }

    #[test]
    fn test_busy_store_is_transient() {
        let busy = DbError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(busy.is_transient());

        let check = DbError::Constraint("tier_current".into());
        assert!(!check.is_transient());
        assert!(!DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows).is_transient());
    }
}
