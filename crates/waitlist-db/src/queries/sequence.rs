//! Position sequence queries.
//!
//! The increment is a single `UPDATE … RETURNING` statement, so reading the
//! old value and committing the new one is one indivisible step inside
//! SQLite's write lock. Run it inside the same transaction as the entrant
//! insert and a rolled-back insert also rolls back the claimed position.

use rusqlite::Connection;

use crate::{DbError, Result};

/// The single sequence row is seeded by the schema; its absence means the
/// database was not migrated.
fn missing_row(err: rusqlite::Error) -> DbError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::Migration("position_sequence row missing".to_string())
        }
        other => DbError::Sqlite(other),
    }
}

/// Claim the next position.
pub fn next_position(conn: &Connection) -> Result<u64> {
    let value: i64 = conn
        .query_row(
            "UPDATE position_sequence SET last_value = last_value + 1
             WHERE id = 1 RETURNING last_value",
            [],
            |row| row.get(0),
        )
        .map_err(missing_row)?;
    Ok(value as u64)
}

/// Last position handed out (0 when nothing has been allocated).
pub fn last_position(conn: &Connection) -> Result<u64> {
    let value: i64 = conn
        .query_row(
            "SELECT last_value FROM position_sequence WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .map_err(missing_row)?;
    Ok(value as u64)
}

/// Raise the sequence to the highest persisted position if it lags behind.
///
/// Only repairs: the sequence never moves backwards and no position is
/// handed out here. Returns the resulting last value.
pub fn resync(conn: &Connection) -> Result<u64> {
    let value: i64 = conn
        .query_row(
            "UPDATE position_sequence
             SET last_value = MAX(last_value, (SELECT COALESCE(MAX(position), 0) FROM entrants))
             WHERE id = 1 RETURNING last_value",
            [],
            |row| row.get(0),
        )
        .map_err(missing_row)?;
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let conn = test_db();
        assert_eq!(last_position(&conn).expect("last"), 0);
        assert_eq!(next_position(&conn).expect("next"), 1);
        assert_eq!(next_position(&conn).expect("next"), 2);
        assert_eq!(last_position(&conn).expect("last"), 2);
    }

    #[test]
    fn test_rolled_back_claim_is_reused() {
        let mut conn = test_db();
        {
            let tx = conn.transaction().expect("tx");
            assert_eq!(next_position(&tx).expect("next"), 1);
            // dropped without commit
        }
        assert_eq!(next_position(&conn).expect("next"), 1);
    }

    #[test]
    fn test_resync_catches_up_with_entrants() {
        use crate::queries::entrants;
        use crate::queries::entrants::tests::sample;

        let conn = test_db();
        entrants::insert(&conn, &sample("e7", "seven@example.com", 7, "SEVEN")).expect("insert");
        assert_eq!(last_position(&conn).expect("last"), 0);

        assert_eq!(resync(&conn).expect("resync"), 7);
        assert_eq!(next_position(&conn).expect("next"), 8);
        // Never moves backwards.
        assert_eq!(resync(&conn).expect("resync"), 8);
    }

    #[test]
    fn test_missing_row_is_not_a_lookup_miss() {
        let conn = test_db();
        conn.execute("DELETE FROM position_sequence", []).expect("delete");
        assert!(matches!(next_position(&conn), Err(DbError::Migration(_))));
        assert!(matches!(last_position(&conn), Err(DbError::Migration(_))));
    }
}
