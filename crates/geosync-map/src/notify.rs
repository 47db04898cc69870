//! Transient, non-blocking notifications.

use crate::timers::TimerSet;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Active notifications, each dismissed automatically after `lifetime`.
pub struct Notifier {
    active: Arc<Mutex<Vec<Notification>>>,
    timers: TimerSet,
    lifetime: Duration,
}

impl Notifier {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            active: Arc::new(Mutex::new(Vec::new())),
            timers: TimerSet::new(),
            lifetime,
        }
    }

    /// Shows a notification. The auto-dismiss timer runs on the runtime the
    /// notifier was created under.
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        };
        self.active.lock().push(notification.clone());

        let id = notification.id;
        let active = Arc::clone(&self.active);
        self.timers.schedule(id.to_string(), self.lifetime, move || {
            active.lock().retain(|n| n.id != id);
        });

        debug!(%id, ?level, message = %notification.message, "Notification shown");
        notification
    }

    /// Dismisses a notification early. Returns false if it was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.timers.cancel(&id.to_string());
        let mut active = self.active.lock();
        let before = active.len();
        active.retain(|n| n.id != id);
        active.len() != before
    }

    /// Active notifications, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.active.lock().clone()
    }

    pub fn clear(&self) {
        self.timers.cancel_all();
        self.active.lock().clear();
    }
}
