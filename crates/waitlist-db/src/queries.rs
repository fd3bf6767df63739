//! Database query functions organized by table.

pub mod entrants;
pub mod referrals;
pub mod sequence;
pub mod shares;
