//! Streak computation and chain tier classification.
//!
//! Everything here is pure: callers pass the reference day explicitly and the
//! functions never read the clock. Calendar days are UTC calendar days.

use crate::models::{
    ChainTier, Milestone, RangeProgress, Run, StreakReport, StreakResult, TierProgress,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use tracing::warn;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

const RANKED_TIERS: [ChainTier; 4] = [
    ChainTier::Bronze,
    ChainTier::Silver,
    ChainTier::Gold,
    ChainTier::Diamond,
];

impl ChainTier {
    /// Minimum current streak that earns this tier.
    pub fn threshold(self) -> u32 {
        match self {
            ChainTier::None => 0,
            ChainTier::Bronze => 1,
            ChainTier::Silver => 15,
            ChainTier::Gold => 30,
            ChainTier::Diamond => 50,
        }
    }

    pub fn next(self) -> Option<ChainTier> {
        match self {
            ChainTier::None => Some(ChainTier::Bronze),
            ChainTier::Bronze => Some(ChainTier::Silver),
            ChainTier::Silver => Some(ChainTier::Gold),
            ChainTier::Gold => Some(ChainTier::Diamond),
            ChainTier::Diamond => None,
        }
    }
}

pub fn classify_tier(current_streak: u32) -> ChainTier {
    RANKED_TIERS
        .iter()
        .rev()
        .copied()
        .find(|tier| current_streak >= tier.threshold())
        .unwrap_or(ChainTier::None)
}

/// Maximal runs of consecutive days, ascending. Duplicates collapse into one day.
pub fn runs<I>(dates: I) -> Vec<Run>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut runs: Vec<Run> = Vec::new();
    for day in days {
        match runs.last_mut() {
            Some(run) if run.end.succ_opt() == Some(day) => {
                run.end = day;
                run.length = run.length.saturating_add(1);
            }
            _ => runs.push(Run {
                start: day,
                end: day,
                length: 1,
            }),
        }
    }
    runs
}

/// Days after `as_of` are ignored. The last run stays current while it ends
/// on `as_of` or the day before.
pub fn compute_streaks<I>(dates: I, as_of: NaiveDate) -> StreakResult
where
    I: IntoIterator<Item = NaiveDate>,
{
    let runs = runs(dates.into_iter().filter(|day| *day <= as_of));
    let longest_streak = runs.iter().map(|run| run.length).max().unwrap_or(0);
    let alive_from = as_of.pred_opt().unwrap_or(as_of);
    let current_streak = match runs.last() {
        Some(run) if run.end >= alive_from => run.length,
        _ => 0,
    };

    StreakResult {
        current_streak,
        longest_streak,
        tier: classify_tier(current_streak),
    }
}

/// Parses stored or submitted day values, excluding the ones that cannot count.
pub fn compute_streaks_from_keys<I>(keys: I, as_of: NaiveDate) -> StreakReport
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut excluded_malformed = 0u32;
    let mut excluded_future = 0u32;
    let mut days = Vec::new();

    for key in keys {
        let raw = key.as_ref();
        match parse_day_key(raw) {
            Some(day) if day > as_of => {
                warn!(entry = raw, %as_of, "excluding future-dated completion");
                excluded_future = excluded_future.saturating_add(1);
            }
            Some(day) => days.push(day),
            None => {
                warn!(entry = raw, "excluding malformed completion date");
                excluded_malformed = excluded_malformed.saturating_add(1);
            }
        }
    }

    StreakReport {
        result: compute_streaks(days, as_of),
        excluded_malformed,
        excluded_future,
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (reduced to its UTC day).
pub fn parse_day_key(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, DAY_FORMAT) {
        return Some(day);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

pub fn tier_progress(current_streak: u32) -> TierProgress {
    let tier = classify_tier(current_streak);
    let next_tier = tier.next();
    let next_threshold = next_tier.map(ChainTier::threshold);
    let percent = match next_threshold {
        Some(target) => {
            let scaled = u64::from(current_streak) * 100 / u64::from(target);
            scaled.min(100) as u8
        }
        None => 100,
    };

    TierProgress {
        tier,
        next_tier,
        next_threshold,
        percent,
    }
}

/// Completion coverage of the inclusive range `start..=end`.
pub fn range_progress<I>(dates: I, start: NaiveDate, end: NaiveDate) -> RangeProgress
where
    I: IntoIterator<Item = NaiveDate>,
{
    if end < start {
        return RangeProgress {
            start,
            end,
            total_days: 0,
            completed_days: 0,
            percent: 0.0,
        };
    }

    let total_days = u32::try_from((end - start).num_days() + 1).unwrap_or(u32::MAX);
    let completed: BTreeSet<NaiveDate> = dates
        .into_iter()
        .filter(|day| (start..=end).contains(day))
        .collect();
    let completed_days = u32::try_from(completed.len()).unwrap_or(u32::MAX);

    RangeProgress {
        start,
        end,
        total_days,
        completed_days,
        percent: f64::from(completed_days) * 100.0 / f64::from(total_days),
    }
}

pub fn milestones(longest_streak: u32) -> Vec<Milestone> {
    RANKED_TIERS
        .iter()
        .map(|&tier| Milestone {
            tier,
            threshold: tier.threshold(),
            achieved: longest_streak >= tier.threshold(),
        })
        .collect()
}
