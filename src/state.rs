use crate::config::Config;
use crate::errors::AppError;
use crate::notify::AlertFeed;
use crate::reconciler::Reconciler;
use crate::storage::{persist_data, KvStore};
use crate::ticker::TickTrigger;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Store and reconciler share one lock so a pass never interleaves with an action.
#[derive(Debug)]
pub struct Tracker {
    pub store: KvStore,
    pub reconciler: Reconciler,
    /// The store holds changes the data file does not have yet.
    dirty: bool,
}

impl Tracker {
    pub fn new(store: KvStore, reconciler: Reconciler) -> Self {
        Self {
            store,
            reconciler,
            dirty: false,
        }
    }

    /// Writes the store after a mutation. On failure the store stays dirty
    /// and [`Tracker::flush`] retries on a later pass.
    pub async fn save(&mut self, path: &Path) -> Result<(), AppError> {
        self.dirty = true;
        if let Err(err) = persist_data(path, &self.store).await {
            warn!("persist failed, will retry: {}", err.message);
            return Err(err);
        }
        self.dirty = false;
        Ok(())
    }

    pub async fn flush(&mut self, path: &Path) -> Result<(), AppError> {
        if self.dirty {
            self.save(path).await?;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<Tracker>>,
    pub alerts: AlertFeed,
    pub ticks: TickTrigger,
}

impl AppState {
    pub fn new(config: &Config, store: KvStore, ticks: TickTrigger) -> Self {
        Self {
            data_path: config.data_path.clone(),
            data: Arc::new(Mutex::new(Tracker::new(store, Reconciler::new(config.scoring)))),
            alerts: AlertFeed::new(config.notifications),
            ticks,
        }
    }
}
