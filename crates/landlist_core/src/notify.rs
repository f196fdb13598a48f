//! Outcome notifications emitted by the listing store.
//!
//! The sink is a collaborator owned by the caller (toast area, console, log).
//! Store operations report to it; they never depend on what it does.

use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One user-facing outcome message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Receiver of store outcome notifications.
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

impl<N: NotificationSink + ?Sized> NotificationSink for Box<N> {
    fn notify(&mut self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, notification: Notification) {
        let Notification { message, severity } = notification;
        match severity {
            Severity::Success | Severity::Info => info!(
                "event=notify module=notify severity={} message={message}",
                severity.as_str()
            ),
            Severity::Warning => {
                warn!("event=notify module=notify severity=warning message={message}")
            }
            Severity::Error => {
                error!("event=notify module=notify severity=error message={message}")
            }
        }
    }
}

/// Keeps every notification in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    notifications: Vec<Notification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn last(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}
