//! Social share query functions.

use rusqlite::{Connection, Row};
use waitlist_types::share::{Platform, SocialShareRecord};

use crate::{classify, Result};

const COLUMNS: &str =
    "user_id, platform, verified, spots_awarded, ip_address, user_agent, created_at, verified_at";

/// Record an unverified share. Returns `false` if one already exists for
/// this (user, platform).
pub fn insert(
    conn: &Connection,
    user_id: &str,
    platform: Platform,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
    created_at: u64,
) -> Result<bool> {
    let written = conn
        .execute(
            "INSERT INTO social_shares (user_id, platform, ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (user_id, platform) DO NOTHING",
            rusqlite::params![
                user_id,
                platform.as_str(),
                ip_address,
                user_agent,
                created_at as i64,
            ],
        )
        .map_err(classify)?;
    Ok(written == 1)
}

/// Flip a share to verified and credit `spots`. Returns `false` when the
/// share was already verified (or does not exist); nothing is written then.
pub fn verify(
    conn: &Connection,
    user_id: &str,
    platform: Platform,
    spots: u64,
    verified_at: u64,
) -> Result<bool> {
    let written = conn
        .execute(
            "UPDATE social_shares SET verified = 1, spots_awarded = ?1, verified_at = ?2
             WHERE user_id = ?3 AND platform = ?4 AND verified = 0",
            rusqlite::params![spots as i64, verified_at as i64, user_id, platform.as_str()],
        )
        .map_err(classify)?;
    Ok(written == 1)
}

/// All shares of a user.
pub fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<SocialShareRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM social_shares WHERE user_id = ?1 ORDER BY platform"
    ))?;
    let rows = stmt
        .query_map([user_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Sum of spots from a user's verified shares.
pub fn share_spots(conn: &Connection, user_id: &str) -> Result<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(spots_awarded), 0) FROM social_shares
         WHERE user_id = ?1 AND verified = 1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SocialShareRecord> {
    let platform: String = row.get(1)?;
    let platform = platform.parse::<Platform>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SocialShareRecord {
        user_id: row.get(0)?,
        platform,
        verified: row.get(2)?,
        spots_awarded: row.get::<_, i64>(3)? as u64,
        ip_address: row.get(4)?,
        user_agent: row.get(5)?,
        created_at: row.get::<_, i64>(6)? as u64,
        verified_at: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
    })
}
