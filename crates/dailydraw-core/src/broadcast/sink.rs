//! OS notification sink boundary.
//!
//! The broadcaster forwards every published notification here after
//! subscribers have run. Sinks are best-effort: an error is logged by the
//! broadcaster and dropped.

use super::notification::Notification;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Arguments of a desktop toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub icon: Option<String>,
    pub tag: String,
    pub require_interaction: bool,
}

impl Toast {
    pub fn from_notification(notification: &Notification, icon: Option<&str>) -> Self {
        Self {
            title: notification.title.clone(),
            message: notification.message.clone(),
            icon: icon.map(str::to_string),
            tag: notification.kind.as_str().to_string(),
            require_interaction: notification.urgent,
        }
    }
}

/// Something that can show a toast. Implementations must return quickly.
pub trait NotificationSink: Send + Sync {
    fn show(&self, toast: &Toast) -> Result<(), SinkError>;
}

/// Headless sink: writes the toast to the log.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn show(&self, toast: &Toast) -> Result<(), SinkError> {
        tracing::info!(
            tag = %toast.tag,
            urgent = toast.require_interaction,
            "{}: {}",
            toast.title,
            toast.message
        );
        Ok(())
    }
}

/// Discards everything. Used when OS notifications are disabled.
#[derive(Debug, Default, Clone)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn show(&self, _toast: &Toast) -> Result<(), SinkError> {
        Ok(())
    }
}
