use serde::Serialize;
use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::info;

const FEED_CAPACITY: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notifications are not permitted")]
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "granted" | "on" | "true" | "1" => Ok(Permission::Granted),
            "denied" | "off" | "false" | "0" => Ok(Permission::Denied),
            other => Err(format!("unknown notification permission `{other}`")),
        }
    }
}

/// Best-effort user-facing side effects. Callers ignore failures.
pub trait Notifier: Send + Sync {
    fn notify(&self, key: &str, title: &str, body: &str) -> Result<(), NotifyError>;
    fn chime(&self, key: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alert {
    Notification { key: String, title: String, body: String },
    Chime { key: String },
}

/// Bounded queue of alerts waiting for a client to pick them up.
#[derive(Debug, Clone)]
pub struct AlertFeed {
    permission: Permission,
    queue: Arc<Mutex<VecDeque<Alert>>>,
}

impl AlertFeed {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission,
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(FEED_CAPACITY))),
        }
    }

    pub fn drain(&self) -> Vec<Alert> {
        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        queue.drain(..).collect()
    }

    fn push(&self, alert: Alert) {
        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if queue.len() == FEED_CAPACITY {
            queue.pop_front();
        }
        queue.push_back(alert);
    }
}

impl Notifier for AlertFeed {
    fn notify(&self, key: &str, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.permission == Permission::Denied {
            return Err(NotifyError::PermissionDenied);
        }
        info!(key, "{title}: {body}");
        self.push(Alert::Notification {
            key: key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn chime(&self, key: &str) -> Result<(), NotifyError> {
        self.push(Alert::Chime { key: key.to_string() });
        Ok(())
    }
}
