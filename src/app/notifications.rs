use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::Success => "✅",
            NotificationKind::Error => "❌",
            NotificationKind::Warning => "⚠️",
            NotificationKind::Info => "ℹ️",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    expires_at: Instant,
}

/// Non-blocking toasts. Each one disappears after `lifetime` unless dismissed
/// earlier.
pub struct NotificationCenter {
    lifetime: Duration,
    active: VecDeque<Notification>,
    raised: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    pub fn new(lifetime: Duration) -> Self {
        let (raised, _) = broadcast::channel(64);
        Self {
            lifetime,
            active: VecDeque::new(),
            raised,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.raised.subscribe()
    }

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) -> Uuid {
        self.notify_at(kind, message, Instant::now())
    }

    pub fn notify_at(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        now: Instant,
    ) -> Uuid {
        let message = message.into();
        match kind {
            NotificationKind::Error => error!("{}", message),
            NotificationKind::Warning => warn!("{}", message),
            NotificationKind::Success | NotificationKind::Info => info!("{}", message),
        }

        let notification = Notification {
            id: Uuid::new_v4(),
            kind,
            message,
            raised_at: Utc::now(),
            expires_at: now + self.lifetime,
        };
        let id = notification.id;
        let _ = self.raised.send(notification.clone());
        self.active
            .retain(|notification| notification.expires_at > now);
        self.active.push_back(notification);
        id
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.active.len();
        self.active.retain(|notification| notification.id != id);
        before != self.active.len()
    }

    /// Drops expired notifications and returns what is still showing.
    pub fn active_at(&mut self, now: Instant) -> Vec<Notification> {
        self.active
            .retain(|notification| notification.expires_at > now);
        self.active.iter().cloned().collect()
    }

    pub fn active(&mut self) -> Vec<Notification> {
        self.active_at(Instant::now())
    }

    /// Messages of every notification still held, oldest first, without
    /// expiring anything.
    pub fn messages(&self) -> Vec<(NotificationKind, String)> {
        self.active
            .iter()
            .map(|notification| (notification.kind, notification.message.clone()))
            .collect()
    }
}
