//! Domain errors.

use waitlist_db::DbError;
use waitlist_tiers::TierError;
use waitlist_types::entrant::EntrantStatus;
use waitlist_types::share::UnknownPlatform;

/// Errors returned by waitlist operations.
#[derive(Debug, thiserror::Error)]
pub enum WaitlistError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    /// A referrer named their own email.
    #[error("an entrant cannot refer themselves")]
    SelfReferral,

    /// The referred email already holds a position.
    #[error("referred email is already on the waitlist")]
    AlreadyOnWaitlist,

    #[error("unknown referral code: {0}")]
    UnknownReferralCode(String),

    #[error("entrant not found: {0}")]
    EntrantNotFound(String),

    #[error("cannot move entrant from {from} to {to}")]
    InvalidTransition {
        from: EntrantStatus,
        to: EntrantStatus,
    },

    /// Position uniqueness kept failing after resyncing the sequence.
    #[error("position allocation conflicted {attempts} times")]
    AllocationConflict { attempts: u32 },

    /// Every derivation attempt for a referral code collided.
    #[error("no free referral code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("tier error: {0}")]
    Tier(#[from] TierError),

    #[error("storage error: {0}")]
    Storage(DbError),
}

impl WaitlistError {
    /// Whether the caller should retry the same request ("try again").
    ///
    /// Validation failures are final, as are storage errors that reject the
    /// data itself. Busy stores and lost or conflicting writes are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AllocationConflict { .. } | Self::CodeSpaceExhausted { .. } => true,
            Self::Storage(err) => {
                err.is_transient()
                    || matches!(err, DbError::NoRowsWritten(_) | DbError::UniqueViolation(_))
            }
            _ => false,
        }
    }
}

impl From<DbError> for WaitlistError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => Self::EntrantNotFound(what),
            other => Self::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for WaitlistError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(DbError::from(err))
    }
}

impl From<UnknownPlatform> for WaitlistError {
    fn from(err: UnknownPlatform) -> Self {
        Self::InvalidPlatform(err.0)
    }
}

/// Convenience result type for waitlist operations.
pub type Result<T> = std::result::Result<T, WaitlistError>;
