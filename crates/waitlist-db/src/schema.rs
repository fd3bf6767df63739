//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Position sequence: single source of truth for queue ranks
-- ============================================================

CREATE TABLE IF NOT EXISTS position_sequence (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_value INTEGER NOT NULL CHECK (last_value >= 0)
);

-- ============================================================
-- Entrants
-- ============================================================

CREATE TABLE IF NOT EXISTS entrants (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    display_name TEXT NOT NULL,
    position INTEGER NOT NULL UNIQUE CHECK (position >= 1),
    tier_at_signup INTEGER NOT NULL CHECK (tier_at_signup >= 1),
    price_at_signup INTEGER NOT NULL,
    tier_current INTEGER NOT NULL CHECK (tier_current >= 1),
    price_current INTEGER NOT NULL,
    spots_awarded INTEGER NOT NULL DEFAULT 0 CHECK (spots_awarded >= 0),
    referral_code TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'active', 'suspended')),
    created_at INTEGER NOT NULL,
    verified_at INTEGER NOT NULL,
    CHECK (tier_current <= tier_at_signup AND tier_current >= tier_at_signup - 1)
);

-- ============================================================
-- Referrals
-- ============================================================

CREATE TABLE IF NOT EXISTS referral_batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    referrer_id TEXT NOT NULL REFERENCES entrants(id),
    spots_awarded INTEGER NOT NULL CHECK (spots_awarded >= 0),
    completed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_batches_referrer ON referral_batches(referrer_id);

CREATE TABLE IF NOT EXISTS referrals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    referrer_id TEXT NOT NULL REFERENCES entrants(id),
    referred_email TEXT NOT NULL COLLATE NOCASE,
    referred_id TEXT REFERENCES entrants(id),
    verified INTEGER NOT NULL DEFAULT 0,
    batch_id INTEGER REFERENCES referral_batches(id),
    counted_toward_spots INTEGER NOT NULL DEFAULT 0,
    ip_fingerprint TEXT,
    user_agent TEXT,
    created_at INTEGER NOT NULL,
    verified_at INTEGER,
    UNIQUE (referrer_id, referred_email),
    CHECK (counted_toward_spots = 0 OR (verified = 1 AND batch_id IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_referrals_email ON referrals(referred_email);
CREATE INDEX IF NOT EXISTS idx_referrals_uncounted
    ON referrals(referrer_id, verified, counted_toward_spots);

-- ============================================================
-- Social shares
-- ============================================================

CREATE TABLE IF NOT EXISTS social_shares (
    user_id TEXT NOT NULL REFERENCES entrants(id),
    platform TEXT NOT NULL
        CHECK (platform IN ('x', 'linkedin', 'facebook', 'reddit', 'whatsapp')),
    verified INTEGER NOT NULL DEFAULT 0,
    spots_awarded INTEGER NOT NULL DEFAULT 0 CHECK (spots_awarded >= 0),
    ip_address TEXT,
    user_agent TEXT,
    created_at INTEGER NOT NULL,
    verified_at INTEGER,
    PRIMARY KEY (user_id, platform),
    CHECK (verified = 1 OR spots_awarded = 0)
);
"#;
