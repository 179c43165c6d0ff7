//! Refresh interval choices and the cache freshness rule.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

/// Refresh interval, restricted to the choices offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum RefreshInterval {
    Minutes15,
    Minutes30,
    #[default]
    Hour1,
    Hours2,
    Hours3,
}

impl RefreshInterval {
    /// All selectable intervals, shortest first.
    pub const ALL: [RefreshInterval; 5] = [
        Self::Minutes15,
        Self::Minutes30,
        Self::Hour1,
        Self::Hours2,
        Self::Hours3,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            Self::Minutes15 => 15,
            Self::Minutes30 => 30,
            Self::Hour1 => 60,
            Self::Hours2 => 120,
            Self::Hours3 => 180,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.minutes()) * 60)
    }

    pub fn as_chrono(self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.minutes()))
    }

    /// Selector label, e.g. "Every 2 hours".
    pub fn label(self) -> &'static str {
        match self {
            Self::Minutes15 => "Every 15 minutes",
            Self::Minutes30 => "Every 30 minutes",
            Self::Hour1 => "Every 1 hour",
            Self::Hours2 => "Every 2 hours",
            Self::Hours3 => "Every 3 hours",
        }
    }
}

impl TryFrom<u32> for RefreshInterval {
    type Error = InvalidInterval;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|i| i.minutes() == minutes)
            .ok_or(InvalidInterval(minutes))
    }
}

impl From<RefreshInterval> for u32 {
    fn from(interval: RefreshInterval) -> Self {
        interval.minutes()
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// A refresh interval outside the offered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("refresh interval must be one of 15, 30, 60, 120 or 180 minutes, got {0}")]
pub struct InvalidInterval(pub u32);

/// Whether a cached entry can stand in for a network fetch.
///
/// Fresh means `0 <= now - fetched_at < interval`. An entry exactly one
/// interval old is stale, and so is one stamped in the future.
pub fn should_use_cache(
    entry: Option<&CacheEntry>,
    now: DateTime<Utc>,
    interval: RefreshInterval,
) -> bool {
    let Some(entry) = entry else {
        return false;
    };
    let age = now.signed_duration_since(entry.fetched_at);
    age >= chrono::Duration::zero() && age < interval.as_chrono()
}
