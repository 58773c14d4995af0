use crate::models::{AppData, DailyPoint, StatsResponse};
use crate::streak::{compute_streaks_from_keys, day_key, milestones};
use chrono::{Duration, NaiveDate, Utc};

pub fn build_stats(data: &AppData, user_id: Option<&str>) -> StatsResponse {
    build_stats_at(Utc::now().date_naive(), data, user_id)
}

pub fn build_stats_at(today: NaiveDate, data: &AppData, user_id: Option<&str>) -> StatsResponse {
    let habits = data.list_habits(user_id);

    let mut total_completions = 0u32;
    let mut current_sum = 0u64;
    let mut best_streak = 0u32;
    for habit in &habits {
        let Some(days) = data.completions.get(&habit.id) else {
            continue;
        };
        let report = compute_streaks_from_keys(days, today);
        total_completions = total_completions.saturating_add(days.len() as u32);
        current_sum += u64::from(report.result.current_streak);
        best_streak = best_streak.max(report.result.longest_streak);
    }

    let average_current_streak = if habits.is_empty() {
        0.0
    } else {
        current_sum as f64 / habits.len() as f64
    };

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let key = day_key(today - Duration::days(offset));
        let habits_completed = habits
            .iter()
            .filter(|habit| {
                data.completions
                    .get(&habit.id)
                    .is_some_and(|days| days.contains(&key))
            })
            .count() as u32;
        last_7_days.push(DailyPoint {
            date: key,
            habits_completed,
        });
    }

    StatsResponse {
        total_habits: habits.len() as u32,
        total_completions,
        average_current_streak,
        best_streak,
        last_7_days,
        achievements: milestones(best_streak),
    }
}
