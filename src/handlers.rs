use crate::errors::{AppError, StoreError};
use crate::models::{
    AppData, ChainQuery, ChainResponse, CompletionResponse, CompletionsResponse,
    CreateHabitRequest, Habit, HabitDetailResponse, HabitQuery, HealthResponse, StatsResponse,
    StreakReport, StreakRequest, ToggleRequest, UpdateHabitRequest,
};
use crate::state::AppState;
use crate::stats::build_stats;
use crate::storage::persist_data;
use crate::store::CompletionChange;
use crate::streak::{
    compute_streaks_from_keys, milestones, parse_day_key, range_progress, runs, tier_progress,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{error, info, warn};

const DEFAULT_CHAIN_DAYS: i64 = 30;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn list_habits(
    State(state): State<AppState>,
    Query(query): Query<HabitQuery>,
) -> Result<Json<Vec<Habit>>, AppError> {
    let today = today();
    let data = state.data.lock().await;
    let habits = data
        .list_habits(query.user_id.as_deref())
        .into_iter()
        .map(|habit| data.fresh_habit(&habit.id, today).map(|(fresh, _)| fresh))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(habits))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<CreateHabitRequest>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let now = now();
    let habit = commit(&state, |data| {
        data.create_habit(&payload.title, &payload.description, payload.user_id, now)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn get_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HabitDetailResponse>, AppError> {
    let data = state.data.lock().await;
    let (habit, streaks) = data.fresh_habit(&id, today())?;
    Ok(Json(HabitDetailResponse {
        progress: tier_progress(streaks.result.current_streak),
        milestones: milestones(streaks.result.longest_streak),
        habit,
        streaks,
    }))
}

pub async fn update_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateHabitRequest>,
) -> Result<Json<Habit>, AppError> {
    let now = now();
    let habit = commit(&state, |data| {
        data.update_habit(
            &id,
            payload.title.as_deref(),
            payload.description.as_deref(),
            now,
        )
    })
    .await?;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    commit(&state, |data| data.delete_habit(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_completions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CompletionsResponse>, AppError> {
    let data = state.data.lock().await;
    let dates = data.list_completions(&id)?;
    Ok(Json(CompletionsResponse { habit_id: id, dates }))
}

pub async fn mark_completion(
    State(state): State<AppState>,
    Path((id, date)): Path<(String, String)>,
) -> Result<Json<CompletionResponse>, AppError> {
    let day = parse_day(&date)?;
    let now = now();
    let change = commit(&state, |data| data.set_completion(&id, day, true, now)).await?;
    Ok(Json(to_response(change)))
}

pub async fn unmark_completion(
    State(state): State<AppState>,
    Path((id, date)): Path<(String, String)>,
) -> Result<Json<CompletionResponse>, AppError> {
    let day = parse_day(&date)?;
    let now = now();
    let change = commit(&state, |data| data.set_completion(&id, day, false, now)).await?;
    Ok(Json(to_response(change)))
}

pub async fn toggle_completion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    let day = parse_day(&payload.date)?;
    let now = now();
    let change = commit(&state, |data| {
        data.toggle_completion(&id, day, payload.expected, now)
    })
    .await
    .inspect_err(|err| {
        if err.status == StatusCode::CONFLICT {
            warn!(habit_id = %id, date = %day, "rejected stale toggle");
        }
    })?;
    Ok(Json(to_response(change)))
}

pub async fn get_chain(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<ChainResponse>, AppError> {
    let today = today();
    let end = match query.end.as_deref() {
        Some(raw) => parse_day(raw)?,
        None => today,
    };
    let start = match query.start.as_deref() {
        Some(raw) => parse_day(raw)?,
        None => end
            .checked_sub_signed(Duration::days(DEFAULT_CHAIN_DAYS))
            .unwrap_or(NaiveDate::MIN),
    };

    let data = state.data.lock().await;
    let keys = data.list_completions(&id)?;
    let tier = data.streak_report(&id, today)?.result.tier;
    let days: Vec<NaiveDate> = keys
        .iter()
        .filter_map(|key| parse_day_key(key))
        .filter(|day| (start..=end).contains(day))
        .collect();

    Ok(Json(ChainResponse {
        habit_id: id,
        tier,
        runs: runs(days.iter().copied()),
        progress: range_progress(days, start, end),
    }))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<HabitQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_stats(&data, query.user_id.as_deref())))
}

/// Stateless engine call for clients that hold their own completion history.
pub async fn compute_streaks(
    Json(payload): Json<StreakRequest>,
) -> Result<Json<StreakReport>, AppError> {
    let as_of = match payload.as_of.as_deref() {
        Some(raw) => parse_day(raw)?,
        None => today(),
    };
    Ok(Json(compute_streaks_from_keys(&payload.dates, as_of)))
}

/// Runs a mutation under the data lock and persists it before releasing the
/// lock. A failed write restores the previous in-memory state.
async fn commit<T>(
    state: &AppState,
    mutate: impl FnOnce(&mut AppData) -> Result<T, StoreError>,
) -> Result<T, AppError> {
    let mut data = state.data.lock().await;
    let snapshot = data.clone();
    let value = mutate(&mut *data)?;

    if let Err(err) = persist_data(&state.data_path, &data).await {
        error!("failed to persist data file: {err}");
        *data = snapshot;
        return Err(err.into());
    }

    Ok(value)
}

fn to_response(change: CompletionChange) -> CompletionResponse {
    info!(
        habit_id = %change.habit.id,
        date = %change.date,
        completed = change.completed,
        current_streak = change.report.result.current_streak,
        "completion updated"
    );
    CompletionResponse {
        habit: change.habit,
        date: change.date,
        completed: change.completed,
        changed: change.changed,
        streaks: change.report,
    }
}

fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    parse_day_key(raw)
        .ok_or_else(|| AppError::bad_request(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

fn today() -> NaiveDate {
    now().date_naive()
}

fn now() -> DateTime<Utc> {
    Utc::now()
}
