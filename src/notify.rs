use bevy::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Non-blocking user-facing report, e.g. the outcome of an upload.
#[derive(Message, Clone, Debug, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

pub(crate) fn log_notifications(mut notifications: MessageReader<Notification>) {
    for notification in notifications.read() {
        match notification.level {
            NotificationLevel::Info => info!("{}", notification.message),
            NotificationLevel::Error => error!("{}", notification.message),
        }
    }
}
