//! Referral and referral-batch query functions.

use rusqlite::{Connection, OptionalExtension, Row};
use waitlist_types::referral::{ReferralBatch, ReferralProgress, ReferralRecord};

use crate::{classify, DbError, Result};

const COLUMNS: &str = "id, referrer_id, referred_email, referred_id, verified, batch_id,
     counted_toward_spots, ip_fingerprint, user_agent, created_at, verified_at";

/// Insert a pending referral. Returns `false` when the
/// (referrer, email) pair already exists; the existing row is left as is.
pub fn insert(
    conn: &Connection,
    referrer_id: &str,
    referred_email: &str,
    ip_fingerprint: Option<&str>,
    user_agent: Option<&str>,
    created_at: u64,
) -> Result<bool> {
    let written = conn
        .execute(
            "INSERT INTO referrals (referrer_id, referred_email, ip_fingerprint, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (referrer_id, referred_email) DO NOTHING",
            rusqlite::params![
                referrer_id,
                referred_email,
                ip_fingerprint,
                user_agent,
                created_at as i64,
            ],
        )
        .map_err(classify)?;
    Ok(written == 1)
}

/// Get the referral for a (referrer, email) pair.
pub fn get(
    conn: &Connection,
    referrer_id: &str,
    referred_email: &str,
) -> Result<Option<ReferralRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM referrals WHERE referrer_id = ?1 AND referred_email = ?2"
            ),
            [referrer_id, referred_email],
            map_row,
        )
        .optional()?;
    Ok(record)
}

/// Mark every unverified referral of `referred_email` as verified by
/// `referred_id`. Returns the affected referrer ids; already-verified rows are
/// untouched, so a replay returns an empty list.
pub fn verify_by_email(
    conn: &Connection,
    referred_email: &str,
    referred_id: &str,
    verified_at: u64,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "UPDATE referrals SET verified = 1, referred_id = ?1, verified_at = ?2
         WHERE referred_email = ?3 AND verified = 0
         RETURNING referrer_id",
    )?;
    let referrers = stmt
        .query_map(
            rusqlite::params![referred_id, verified_at as i64, referred_email],
            |row| row.get::<_, String>(0),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(classify)?;
    Ok(referrers)
}

/// Referrers whose referral of `referred_email` is verified.
pub fn verified_referrers_of(conn: &Connection, referred_email: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT referrer_id FROM referrals
         WHERE referred_email = ?1 AND verified = 1
         ORDER BY id",
    )?;
    let referrers = stmt
        .query_map([referred_email], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(referrers)
}

/// Ids of the oldest verified, not-yet-counted referrals for a referrer.
pub fn uncounted_verified(conn: &Connection, referrer_id: &str, limit: u32) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM referrals
         WHERE referrer_id = ?1 AND verified = 1 AND counted_toward_spots = 0
         ORDER BY verified_at, id
         LIMIT ?2",
    )?;
    let ids = stmt
        .query_map(rusqlite::params![referrer_id, limit], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Create a batch row and return its id.
pub fn insert_batch(
    conn: &Connection,
    referrer_id: &str,
    spots_awarded: u64,
    completed_at: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO referral_batches (referrer_id, spots_awarded, completed_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![referrer_id, spots_awarded as i64, completed_at as i64],
    )
    .map_err(classify)?;
    Ok(conn.last_insert_rowid())
}

/// Attach referrals to a batch. Only rows that are still uncounted are
/// touched; every id must be written or the caller's transaction must abort.
pub fn mark_counted(conn: &Connection, referral_ids: &[i64], batch_id: i64) -> Result<()> {
    let mut stmt = conn.prepare(
        "UPDATE referrals SET counted_toward_spots = 1, batch_id = ?1
         WHERE id = ?2 AND verified = 1 AND counted_toward_spots = 0",
    )?;
    for id in referral_ids {
        let written = stmt.execute(rusqlite::params![batch_id, id]).map_err(classify)?;
        if written != 1 {
            return Err(DbError::NoRowsWritten(format!(
                "referral {id} was already counted"
            )));
        }
    }
    Ok(())
}

/// Sum of spots from all completed batches of a referrer.
pub fn batch_spots(conn: &Connection, referrer_id: &str) -> Result<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(spots_awarded), 0) FROM referral_batches WHERE referrer_id = ?1",
        [referrer_id],
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

/// Completed batches of a referrer, oldest first.
pub fn batches(conn: &Connection, referrer_id: &str) -> Result<Vec<ReferralBatch>> {
    let mut stmt = conn.prepare(
        "SELECT id, referrer_id, spots_awarded, completed_at FROM referral_batches
         WHERE referrer_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([referrer_id], |row| {
            Ok(ReferralBatch {
                id: row.get(0)?,
                referrer_id: row.get(1)?,
                spots_awarded: row.get::<_, i64>(2)? as u64,
                completed_at: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Aggregate referral counters for a referrer.
pub fn progress(conn: &Connection, referrer_id: &str) -> Result<ReferralProgress> {
    let (pending, verified, counted): (i64, i64, i64) = conn.query_row(
        "SELECT
             COALESCE(SUM(CASE WHEN verified = 0 THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN verified = 1 THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN counted_toward_spots = 1 THEN 1 ELSE 0 END), 0)
         FROM referrals WHERE referrer_id = ?1",
        [referrer_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    let (batches_completed, spots): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(spots_awarded), 0)
         FROM referral_batches WHERE referrer_id = ?1",
        [referrer_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(ReferralProgress {
        pending: pending as u32,
        verified: verified as u32,
        counted: counted as u32,
        batches_completed: batches_completed as u32,
        spots_from_referrals: spots as u64,
    })
}

/// All referrals made by a referrer, oldest first.
pub fn list_for_referrer(conn: &Connection, referrer_id: &str) -> Result<Vec<ReferralRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM referrals WHERE referrer_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([referrer_id], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ReferralRecord> {
    Ok(ReferralRecord {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        referred_email: row.get(2)?,
        referred_id: row.get(3)?,
        verified: row.get(4)?,
        batch_id: row.get(5)?,
        counted_toward_spots: row.get(6)?,
        ip_fingerprint: row.get(7)?,
        user_agent: row.get(8)?,
        created_at: row.get::<_, i64>(9)? as u64,
        verified_at: row.get::<_, Option<i64>>(10)?.map(|v| v as u64),
    })
}
