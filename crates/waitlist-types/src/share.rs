//! Social share structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EntrantId;

/// Platforms a share can be credited for. Fixed set of five.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    X,
    Linkedin,
    Facebook,
    Reddit,
    Whatsapp,
}

impl Platform {
    /// Every creditable platform.
    pub const ALL: [Platform; 5] = [
        Platform::X,
        Platform::Linkedin,
        Platform::Facebook,
        Platform::Reddit,
        Platform::Whatsapp,
    ];

    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Linkedin => "linkedin",
            Self::Facebook => "facebook",
            Self::Reddit => "reddit",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform string outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "twitter" => Ok(Self::X),
            "linkedin" => Ok(Self::Linkedin),
            "facebook" => Ok(Self::Facebook),
            "reddit" => Ok(Self::Reddit),
            "whatsapp" => Ok(Self::Whatsapp),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// One share per (user, platform).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialShareRecord {
    pub user_id: EntrantId,
    pub platform: Platform,
    pub verified: bool,
    /// 0 until verified, then the per-share amount.
    pub spots_awarded: u64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: u64,
    pub verified_at: Option<u64>,
}
