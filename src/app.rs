use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route("/api/tick", post(handlers::tick))
        .route("/api/events/start", post(handlers::start_event))
        .route("/api/micro", post(handlers::mark_micro))
        .route("/api/water", post(handlers::mark_water))
        .route("/api/water/done", post(handlers::mark_water_done))
        .route("/api/timetable", get(handlers::get_timetable).put(handlers::put_timetable))
        .route("/api/history", get(handlers::get_history))
        .route("/api/history/:date", get(handlers::get_day))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/alerts", get(handlers::get_alerts))
        .with_state(state)
}
