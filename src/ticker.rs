//! Scheduled reconciliation.
//!
//! Every trigger (the interval, client visibility and focus pings, timetable
//! writes, user actions, page renders) ends up in [`reconcile_now`]. The
//! reconciler itself debounces non-forcing triggers within a minute.

use crate::clock::Moment;
use crate::errors::AppError;
use crate::models::DayView;
use crate::reconciler::TickSource;
use crate::state::AppState;
use crate::view::build_day_view;
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, error, info};

/// Cheap handle for queueing a tick on the background ticker.
#[derive(Debug, Clone)]
pub struct TickTrigger(mpsc::UnboundedSender<TickSource>);

impl TickTrigger {
    pub fn fire(&self, source: TickSource) {
        if self.0.send(source).is_err() {
            debug!(%source, "ticker stopped, trigger dropped");
        }
    }
}

pub fn tick_channel() -> (TickTrigger, mpsc::UnboundedReceiver<TickSource>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TickTrigger(tx), rx)
}

/// One reconciliation pass at the current wall-clock minute, persisting any
/// change (or an earlier one whose write failed), followed by a fresh view
/// of the day.
pub async fn reconcile_now(state: &AppState, source: TickSource) -> Result<DayView, AppError> {
    let now = Moment::now();
    let mut guard = state.data.lock().await;
    let tracker = &mut *guard;
    let outcome = tracker.reconciler.tick(&mut tracker.store, now, source, &state.alerts);
    if outcome.changed() {
        tracker.save(&state.data_path).await?;
    } else {
        tracker.flush(&state.data_path).await?;
    }
    Ok(build_day_view(&tracker.store, now))
}

pub struct Ticker {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(state: AppState, mut triggers: mpsc::UnboundedReceiver<TickSource>, period: Duration) -> Self {
        let (shutdown, mut stop) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "ticker started");

            loop {
                let source = tokio::select! {
                    _ = &mut stop => break,
                    _ = interval.tick() => TickSource::Interval,
                    Some(source) = triggers.recv() => source,
                };
                if let Err(err) = reconcile_now(&state, source).await {
                    error!(%source, "tick failed: {}", err.message);
                }
            }

            info!("ticker stopped");
        });

        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.shutdown.take() {
            let _ = stop.send(());
        }
        if let Err(err) = self.handle.await {
            error!("ticker task ended abnormally: {err}");
        }
    }
}
