//! Habit records and completion sets held in [`AppData`].
//!
//! Callers serialize access through the state mutex; every completion
//! mutation refreshes the habit's cached streak fields before returning.

use crate::errors::StoreError;
use crate::models::{AppData, Habit, StreakReport};
use crate::streak::{compute_streaks_from_keys, day_key};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of a completion write.
#[derive(Debug, Clone)]
pub struct CompletionChange {
    pub date: String,
    pub completed: bool,
    pub changed: bool,
    pub habit: Habit,
    pub report: StreakReport,
}

impl AppData {
    /// Newest habits first, optionally restricted to one owner.
    pub fn list_habits(&self, user_id: Option<&str>) -> Vec<&Habit> {
        let mut habits: Vec<&Habit> = self
            .habits
            .values()
            .filter(|habit| user_id.is_none_or(|owner| habit.user_id.as_deref() == Some(owner)))
            .collect();
        habits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        habits
    }

    pub fn habit(&self, id: &str) -> Result<&Habit, StoreError> {
        self.habits
            .get(id)
            .ok_or_else(|| StoreError::HabitNotFound(id.to_string()))
    }

    pub fn create_habit(
        &mut self,
        title: &str,
        description: &str,
        user_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Habit, StoreError> {
        let title = validate_title(title)?;
        let habit = Habit {
            id: Uuid::new_v4().to_string(),
            title,
            description: description.trim().to_string(),
            user_id: user_id.filter(|owner| !owner.trim().is_empty()),
            created_at: now,
            updated_at: now,
            current_streak: 0,
            longest_streak: 0,
            chain_color: Default::default(),
        };

        info!(habit_id = %habit.id, title = %habit.title, "created habit");
        self.habits.insert(habit.id.clone(), habit.clone());
        Ok(habit)
    }

    /// Only the text fields are writable; streak fields belong to the engine.
    pub fn update_habit(
        &mut self,
        id: &str,
        title: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Habit, StoreError> {
        let title = title.map(validate_title).transpose()?;
        let habit = self
            .habits
            .get_mut(id)
            .ok_or_else(|| StoreError::HabitNotFound(id.to_string()))?;

        if let Some(title) = title {
            habit.title = title;
        }
        if let Some(description) = description {
            habit.description = description.trim().to_string();
        }
        habit.updated_at = now;
        Ok(habit.clone())
    }

    pub fn delete_habit(&mut self, id: &str) -> Result<Habit, StoreError> {
        let habit = self
            .habits
            .remove(id)
            .ok_or_else(|| StoreError::HabitNotFound(id.to_string()))?;
        let dropped = self.completions.remove(id).map_or(0, |days| days.len());
        info!(habit_id = id, dropped, "deleted habit");
        Ok(habit)
    }

    /// Day keys in ascending order.
    pub fn list_completions(&self, id: &str) -> Result<Vec<String>, StoreError> {
        self.habit(id)?;
        Ok(self
            .completions
            .get(id)
            .map(|days| days.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn is_completed(&self, id: &str, day: NaiveDate) -> bool {
        self.completions
            .get(id)
            .is_some_and(|days| days.contains(&day_key(day)))
    }

    /// Idempotent write by natural key `(habit, day)`.
    pub fn set_completion(
        &mut self,
        id: &str,
        day: NaiveDate,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<CompletionChange, StoreError> {
        self.habit(id)?;
        let key = day_key(day);
        let changed = if completed {
            self.completions
                .entry(id.to_string())
                .or_default()
                .insert(key.clone())
        } else {
            let removed = self
                .completions
                .get_mut(id)
                .is_some_and(|days| days.remove(&key));
            if self.completions.get(id).is_some_and(|days| days.is_empty()) {
                self.completions.remove(id);
            }
            removed
        };

        debug!(habit_id = id, date = %key, completed, changed, "completion written");
        let (habit, report) = self.recompute(id, now)?;
        Ok(CompletionChange {
            date: key,
            completed,
            changed,
            habit,
            report,
        })
    }

    /// Flips the day. A stale `expected` state is rejected without writing.
    pub fn toggle_completion(
        &mut self,
        id: &str,
        day: NaiveDate,
        expected: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<CompletionChange, StoreError> {
        self.habit(id)?;
        let present = self.is_completed(id, day);
        if expected.is_some_and(|believed| believed != present) {
            return Err(StoreError::Conflict {
                date: day_key(day),
            });
        }
        self.set_completion(id, day, !present, now)
    }

    pub fn streak_report(&self, id: &str, as_of: NaiveDate) -> Result<StreakReport, StoreError> {
        self.habit(id)?;
        Ok(self.report_for(id, as_of))
    }

    /// Copy of the habit with its cached streak fields brought up to `as_of`,
    /// without touching the stored record.
    pub fn fresh_habit(&self, id: &str, as_of: NaiveDate) -> Result<(Habit, StreakReport), StoreError> {
        let mut habit = self.habit(id)?.clone();
        let report = self.report_for(id, as_of);
        apply_report(&mut habit, &report);
        Ok((habit, report))
    }

    /// Brings every cached streak up to date; returns how many habits changed.
    pub fn refresh_streaks(&mut self, as_of: NaiveDate) -> usize {
        let ids: Vec<String> = self.habits.keys().cloned().collect();
        let mut changed = 0;
        for id in ids {
            let report = self.report_for(&id, as_of);
            if let Some(habit) = self.habits.get_mut(&id) {
                if apply_report(habit, &report) {
                    changed += 1;
                }
            }
        }
        changed
    }

    fn report_for(&self, id: &str, as_of: NaiveDate) -> StreakReport {
        match self.completions.get(id) {
            Some(days) => compute_streaks_from_keys(days, as_of),
            None => StreakReport::default(),
        }
    }

    fn recompute(&mut self, id: &str, now: DateTime<Utc>) -> Result<(Habit, StreakReport), StoreError> {
        let report = self.report_for(id, now.date_naive());
        let habit = self
            .habits
            .get_mut(id)
            .ok_or_else(|| StoreError::HabitNotFound(id.to_string()))?;
        apply_report(habit, &report);
        habit.updated_at = now;
        Ok((habit.clone(), report))
    }
}

fn apply_report(habit: &mut Habit, report: &StreakReport) -> bool {
    let result = report.result;
    let changed = habit.current_streak != result.current_streak
        || habit.longest_streak != result.longest_streak
        || habit.chain_color != result.tier;
    habit.current_streak = result.current_streak;
    habit.longest_streak = result.longest_streak;
    habit.chain_color = result.tier;
    changed
}

fn validate_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Invalid("title must not be empty".into()));
    }
    Ok(title.to_string())
}
