//! Ticket allocator.
//!
//! Positions come from the single-row sequence in the database. The claim is
//! one `UPDATE … RETURNING` statement, so read and increment are a single
//! step under SQLite's write lock; it is never derived from `MAX(position)`.
//!
//! During signup the claim shares a transaction with the entrant insert. If
//! the insert fails the claim rolls back with it, which keeps the persisted
//! positions dense.

use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;
use waitlist_db::queries::sequence;
use waitlist_types::Position;

use crate::{Result, Waitlist};

/// Claim the next position inside the caller's transaction.
pub fn claim(conn: &Connection) -> Result<Position> {
    Ok(sequence::next_position(conn)?)
}

impl Waitlist {
    /// Claim and commit the next position on its own.
    ///
    /// Concurrent callers receive distinct, consecutive positions.
    pub async fn allocate(&self) -> Result<Position> {
        let mut db = self.db.lock().await;
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let position = claim(&tx)?;
        tx.commit()?;
        debug!(position, "position allocated");
        Ok(position)
    }

    /// Last position handed out.
    pub async fn last_position(&self) -> Result<Position> {
        let db = self.db.lock().await;
        Ok(sequence::last_position(&db)?)
    }
}
