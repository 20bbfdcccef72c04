//! Daily check-in calendar.
//!
//! "Today" is the community's calendar day in a named IANA zone. Date math
//! goes through `chrono-tz`, so daylight-saving transitions land on the right
//! day.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::decode::lenient_timestamp;
use crate::error::FundingError;

pub const DEFAULT_TIME_ZONE: &str = "America/Denver";
pub const DEFAULT_MILESTONES: [u32; 7] = [3, 7, 14, 30, 60, 100, 365];

pub fn parse_zone(name: &str) -> Result<Tz, FundingError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| FundingError::Config(format!("unknown time zone '{name}'")))
}

/// Calendar day of `instant` in `zone`.
pub fn community_day(instant: DateTime<Utc>, zone: Tz) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

pub fn community_today(zone: Tz) -> NaiveDate {
    community_day(Utc::now(), zone)
}

/// A `daily_check_ins` row.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckIn {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, alias = "created_at", deserialize_with = "lenient_timestamp")]
    pub checked_in_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

/// Non-empty, strictly ascending, positive streak lengths worth celebrating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestones(Vec<u32>);

impl Milestones {
    pub fn new(days: Vec<u32>) -> Result<Self, FundingError> {
        if days.is_empty() {
            return Err(FundingError::Config("milestones must not be empty".into()));
        }
        if days.first() == Some(&0) {
            return Err(FundingError::Config("milestones must be positive".into()));
        }
        if days.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FundingError::Config(format!(
                "milestones must be strictly ascending, got {days:?}"
            )));
        }
        Ok(Self(days))
    }

    /// The milestone hit exactly by `streak`, if any.
    pub fn reached(&self, streak: u32) -> Option<u32> {
        self.0.binary_search(&streak).ok().map(|i| self.0[i])
    }

    /// Smallest milestone strictly above `streak`.
    pub fn next(&self, streak: u32) -> Option<u32> {
        self.0.iter().copied().find(|&m| m > streak)
    }

    pub fn days(&self) -> &[u32] {
        &self.0
    }
}

impl Default for Milestones {
    fn default() -> Self {
        Self(DEFAULT_MILESTONES.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Streaks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakStatus {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub checked_in_today: bool,
    pub last_check_in: Option<NaiveDate>,
    pub reached_milestone: Option<u32>,
    pub next_milestone: Option<u32>,
}

/// Streak state as of `today`.
///
/// Several check-ins on one local day count once. A streak survives until the
/// end of the day after its last check-in. Check-ins dated after `today` are
/// ignored.
pub fn compute_streak(
    check_ins: &[DateTime<Utc>],
    zone: Tz,
    today: NaiveDate,
    milestones: &Milestones,
) -> StreakStatus {
    let days: BTreeSet<NaiveDate> = check_ins
        .iter()
        .map(|instant| community_day(*instant, zone))
        .filter(|day| {
            let ok = *day <= today;
            if !ok {
                log::debug!("ignoring check-in dated {day}, after {today}");
            }
            ok
        })
        .collect();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for day in &days {
        run = match prev {
            Some(p) if *day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(*day);
    }

    let last = days.last().copied();
    let alive = last.is_some_and(|d| d == today || d + Duration::days(1) == today);
    // `run` is the length of the run ending at `last`.
    let current = if alive { run } else { 0 };

    StreakStatus {
        current_streak: current,
        longest_streak: longest,
        checked_in_today: last == Some(today),
        last_check_in: last,
        reached_milestone: milestones.reached(current),
        next_milestone: milestones.next(current),
    }
}
