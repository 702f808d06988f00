use crate::actions;
use crate::clock::{Moment, parse_date_key};
use crate::errors::AppError;
use crate::models::{
    validate_timetable, DayLogResponse, DayView, HistoryResponse, MicroRequest,
    StartRequest, StatsResponse, TickRequest, TimetableBlock, WaterRequest,
};
use crate::notify::Alert;
use crate::reconciler::TickSource;
use crate::scoring::ScoringRules;
use crate::state::AppState;
use crate::stats::{build_history, build_stats, summarize_day};
use crate::storage::KvStore;
use crate::ticker::reconcile_now;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

pub async fn get_today(State(state): State<AppState>) -> Result<Json<DayView>, AppError> {
    Ok(Json(reconcile_now(&state, TickSource::Render).await?))
}

pub async fn tick(
    State(state): State<AppState>,
    Json(payload): Json<TickRequest>,
) -> Result<StatusCode, AppError> {
    let source: TickSource = payload.source.parse().map_err(AppError::bad_request)?;
    state.ticks.fire(source);
    Ok(StatusCode::ACCEPTED)
}

pub async fn start_event(
    State(state): State<AppState>,
    Json(payload): Json<StartRequest>,
) -> Result<Json<DayView>, AppError> {
    let view = apply_action(&state, |store, _, now| {
        let block = find_block(&store.timetable(), &payload.name)?;
        Ok(actions::start_main_event(store, now, &block)?)
    })
    .await?;
    Ok(Json(view))
}

pub async fn mark_micro(
    State(state): State<AppState>,
    Json(payload): Json<MicroRequest>,
) -> Result<Json<DayView>, AppError> {
    let view = apply_action(&state, |store, rules, now| {
        let block = find_block(&store.timetable(), &payload.parent)?;
        actions::mark_block_water(store, rules, now, &block, payload.slot)?;
        Ok(true)
    })
    .await?;
    Ok(Json(view))
}

pub async fn mark_water(
    State(state): State<AppState>,
    Json(payload): Json<WaterRequest>,
) -> Result<Json<DayView>, AppError> {
    let view = apply_action(&state, |store, rules, now| {
        let timetable = store.timetable();
        actions::mark_water(store, rules, now, &timetable, payload.slot)?;
        Ok(true)
    })
    .await?;
    Ok(Json(view))
}

pub async fn mark_water_done(
    State(state): State<AppState>,
    Json(payload): Json<WaterRequest>,
) -> Result<Json<DayView>, AppError> {
    let view = apply_action(&state, |store, _, now| {
        Ok(actions::mark_water_done(store, now.date, payload.slot))
    })
    .await?;
    Ok(Json(view))
}

pub async fn get_timetable(State(state): State<AppState>) -> Json<Vec<TimetableBlock>> {
    let data = state.data.lock().await;
    Json(data.store.timetable())
}

pub async fn put_timetable(
    State(state): State<AppState>,
    Json(blocks): Json<Vec<TimetableBlock>>,
) -> Result<Json<Vec<TimetableBlock>>, AppError> {
    validate_timetable(&blocks)?;
    {
        let mut data = state.data.lock().await;
        if data.store.set_timetable(&blocks) {
            data.save(&state.data_path).await?;
            info!(blocks = blocks.len(), "timetable replaced");
        }
    }
    reconcile_now(&state, TickSource::StorageChanged).await?;
    Ok(Json(blocks))
}

pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let data = state.data.lock().await;
    Json(HistoryResponse {
        days: build_history(&data.store),
    })
}

pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayLogResponse>, AppError> {
    let date = parse_date_key(&date)?;
    let data = state.data.lock().await;
    let log = data.store.log(date);
    Ok(Json(DayLogResponse {
        date: date.to_string(),
        summary: summarize_day(date, &log),
        log,
    }))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let data = state.data.lock().await;
    Json(build_stats(&data.store))
}

pub async fn get_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(state.alerts.drain())
}

/// Runs `action` under the lock, persists if it reported a change, then
/// reconciles with a forcing trigger.
async fn apply_action<F>(state: &AppState, action: F) -> Result<DayView, AppError>
where
    F: FnOnce(&mut KvStore, &ScoringRules, Moment) -> Result<bool, AppError>,
{
    let now = Moment::now();
    {
        let mut guard = state.data.lock().await;
        let tracker = &mut *guard;
        let rules = *tracker.reconciler.rules();
        if action(&mut tracker.store, &rules, now)? {
            tracker.save(&state.data_path).await?;
        }
    }
    reconcile_now(state, TickSource::UserAction).await
}

fn find_block(timetable: &[TimetableBlock], name: &str) -> Result<TimetableBlock, AppError> {
    timetable
        .iter()
        .find(|block| block.name == name)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("no block named `{name}` in the timetable")))
}
