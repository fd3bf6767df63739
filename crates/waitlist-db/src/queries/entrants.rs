//! Entrant query functions.

use rusqlite::{Connection, OptionalExtension, Row};
use waitlist_types::entrant::{Entrant, EntrantStatus};

use crate::{classify, not_found, DbError, Result};

const COLUMNS: &str = "id, email, display_name, position, tier_at_signup, price_at_signup,
     tier_current, price_current, spots_awarded, referral_code, status,
     created_at, verified_at";

/// Insert a new entrant. Exactly one row must be written.
///
/// Uniqueness failures surface as [`DbError::UniqueViolation`] naming the
/// column (`entrants.email`, `entrants.referral_code`, `entrants.position`).
pub fn insert(conn: &Connection, entrant: &Entrant) -> Result<()> {
    let written = conn
        .execute(
            "INSERT INTO entrants (id, email, display_name, position, tier_at_signup,
                 price_at_signup, tier_current, price_current, spots_awarded,
                 referral_code, status, created_at, verified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                entrant.id,
                entrant.email,
                entrant.display_name,
                entrant.position as i64,
                entrant.tier_at_signup,
                entrant.price_at_signup as i64,
                entrant.tier_current,
                entrant.price_current as i64,
                entrant.spots_awarded as i64,
                entrant.referral_code,
                entrant.status.as_str(),
                entrant.created_at as i64,
                entrant.verified_at as i64,
            ],
        )
        .map_err(classify)?;
    if written != 1 {
        return Err(DbError::NoRowsWritten(format!("entrant {}", entrant.id)));
    }
    Ok(())
}

/// Get an entrant by id.
pub fn get(conn: &Connection, id: &str) -> Result<Entrant> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM entrants WHERE id = ?1"),
        [id],
        map_row,
    )
    .map_err(not_found(id))
}

/// Find an entrant by email (case-insensitive).
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Entrant>> {
    let entrant = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM entrants WHERE email = ?1"),
            [email],
            map_row,
        )
        .optional()?;
    Ok(entrant)
}

/// Find an entrant by referral code.
pub fn find_by_code(conn: &Connection, code: &str) -> Result<Option<Entrant>> {
    let entrant = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM entrants WHERE referral_code = ?1"),
            [code],
            map_row,
        )
        .optional()?;
    Ok(entrant)
}

/// Whether a referral code is already taken.
pub fn code_exists(conn: &Connection, code: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entrants WHERE referral_code = ?1)",
        [code],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Highest persisted position (0 when empty). Read-only; never used to
/// assign positions.
pub fn max_position(conn: &Connection) -> Result<u64> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position), 0) FROM entrants",
        [],
        |row| row.get(0),
    )?;
    Ok(max as u64)
}

/// Number of entrants.
pub fn count(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entrants", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Write the derived tier state. Position and signup tier are never touched.
pub fn update_tier(
    conn: &Connection,
    id: &str,
    spots_awarded: u64,
    tier_current: u32,
    price_current: u64,
) -> Result<()> {
    let written = conn
        .execute(
            "UPDATE entrants SET spots_awarded = ?1, tier_current = ?2, price_current = ?3
             WHERE id = ?4 AND spots_awarded <= ?1",
            rusqlite::params![spots_awarded as i64, tier_current, price_current as i64, id],
        )
        .map_err(classify)?;
    if written != 1 {
        return Err(DbError::NoRowsWritten(format!(
            "tier update for entrant {id} (missing or spots would decrease)"
        )));
    }
    Ok(())
}

/// Move `id` from `from` to `to`. Returns false if the entrant was not in
/// `from` at write time.
pub fn update_status(
    conn: &Connection,
    id: &str,
    from: EntrantStatus,
    to: EntrantStatus,
) -> Result<bool> {
    let written = conn
        .execute(
            "UPDATE entrants SET status = ?1 WHERE id = ?2 AND status = ?3",
            rusqlite::params![to.as_str(), id, from.as_str()],
        )
        .map_err(classify)?;
    Ok(written == 1)
}

/// List entrants in queue order.
pub fn list(conn: &Connection, offset: u64, limit: u32) -> Result<Vec<Entrant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM entrants ORDER BY position LIMIT ?1 OFFSET ?2"
    ))?;

    let rows = stmt
        .query_map(rusqlite::params![limit, offset as i64], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Entrant> {
    let status: String = row.get(10)?;
    let status = status.parse::<EntrantStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Entrant {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        position: row.get::<_, i64>(3)? as u64,
        tier_at_signup: row.get(4)?,
        price_at_signup: row.get::<_, i64>(5)? as u64,
        tier_current: row.get(6)?,
        price_current: row.get::<_, i64>(7)? as u64,
        spots_awarded: row.get::<_, i64>(8)? as u64,
        referral_code: row.get(9)?,
        status,
        created_at: row.get::<_, i64>(11)? as u64,
        verified_at: row.get::<_, i64>(12)? as u64,
    })
}
