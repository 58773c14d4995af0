use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Badge level of a habit's chain, ordered from unranked to diamond.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ChainTier {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
    Diamond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreakResult {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub tier: ChainTier,
}

/// Streak facts plus the number of entries the engine refused to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreakReport {
    #[serde(flatten)]
    pub result: StreakResult,
    pub excluded_malformed: u32,
    pub excluded_future: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Run {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeProgress {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_days: u32,
    pub completed_days: u32,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub tier: ChainTier,
    pub next_tier: Option<ChainTier>,
    pub next_threshold: Option<u32>,
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub tier: ChainTier,
    pub threshold: u32,
    pub achieved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub chain_color: ChainTier,
}

/// Everything the service persists. Completion sets are keyed by habit id and
/// hold `YYYY-MM-DD` day keys.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub habits: BTreeMap<String, Habit>,
    #[serde(default)]
    pub completions: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateHabitRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub date: String,
    /// Whether the caller believes the day is currently completed.
    #[serde(default)]
    pub expected: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StreakRequest {
    pub dates: Vec<String>,
    #[serde(default)]
    pub as_of: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct HabitQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChainQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HabitDetailResponse {
    pub habit: Habit,
    pub streaks: StreakReport,
    pub progress: TierProgress,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Serialize)]
pub struct CompletionsResponse {
    pub habit_id: String,
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub habit: Habit,
    pub date: String,
    pub completed: bool,
    pub changed: bool,
    pub streaks: StreakReport,
}

#[derive(Debug, Serialize)]
pub struct ChainResponse {
    pub habit_id: String,
    pub tier: ChainTier,
    pub runs: Vec<Run>,
    pub progress: RangeProgress,
}

#[derive(Debug, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub habits_completed: u32,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_habits: u32,
    pub total_completions: u32,
    pub average_current_streak: f64,
    pub best_streak: u32,
    pub last_7_days: Vec<DailyPoint>,
    pub achievements: Vec<Milestone>,
}
