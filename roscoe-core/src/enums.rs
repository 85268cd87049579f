//! Enum types for flag state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire value for "no flag known for this user".
pub const NO_FLAG: u8 = 0;

/// Wire value for "queued, processed and found positive".
///
/// Only ever produced by lookups; never stored.
pub const QUEUED_POSITIVE: u8 = 3;

/// Flag classification as stored in the live table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum FlagType {
    /// Flagged by automated review
    Flagged = 1,
    /// Confirmed by a human moderator
    Confirmed = 2,
}

impl FlagType {
    /// Numeric code used in storage and on the wire.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FlagType::Flagged),
            2 => Some(FlagType::Confirmed),
            _ => None,
        }
    }
}

impl From<FlagType> for u8 {
    fn from(value: FlagType) -> Self {
        value.as_u8()
    }
}

impl TryFrom<u8> for FlagType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FlagType::from_u8(value).ok_or_else(|| format!("invalid flag type: {}", value))
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagType::Flagged => write!(f, "flagged"),
            FlagType::Confirmed => write!(f, "confirmed"),
        }
    }
}
