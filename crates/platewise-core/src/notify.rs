//! Actionable alerts for failures only the user can fix.
//!
//! Only [`ErrorKind::Auth`] and [`ErrorKind::PermissionDenied`] produce an
//! alert. Every other terminal failure stays silent apart from the log.
//! Alerts carry exactly one recovery action, expressed as a reference the
//! host UI resolves; this module never navigates itself.

use crate::analysis::ErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Reference the host resolves to its settings screen.
pub const OPEN_CONFIGURATION_REF: &str = "platewise://settings/analysis";

/// Reference the host resolves to its health-permission prompt.
pub const GRANT_ACCESS_REF: &str = "platewise://settings/health-access";

/// The single recovery action offered by an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    OpenConfiguration,
    GrantAccess,
}

impl RecoveryAction {
    pub fn label(self) -> &'static str {
        match self {
            RecoveryAction::OpenConfiguration => "Open configuration",
            RecoveryAction::GrantAccess => "Grant access",
        }
    }

    pub fn action_ref(self) -> &'static str {
        match self {
            RecoveryAction::OpenConfiguration => OPEN_CONFIGURATION_REF,
            RecoveryAction::GrantAccess => GRANT_ACCESS_REF,
        }
    }

    fn for_kind(kind: ErrorKind) -> Option<Self> {
        match kind {
            ErrorKind::Auth => Some(RecoveryAction::OpenConfiguration),
            ErrorKind::PermissionDenied => Some(RecoveryAction::GrantAccess),
            _ => None,
        }
    }
}

/// A dismissible, persistent alert handed to the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Stable per photo, so a newer alert replaces an older one
    pub id: String,
    pub title: String,
    pub message: String,
    pub action_label: String,
    pub action_ref: String,
    #[serde(skip)]
    pub action: RecoveryAction,
}

/// What the dispatcher knows about the failed job.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub photo_id: String,
    pub attempt: u32,
    pub captured_at: DateTime<Utc>,
}

/// Host-side receiver of alerts.
pub trait AlertSink: Send + Sync {
    /// Show (or replace) an alert.
    fn post(&self, alert: Alert);

    /// Remove an alert. Must not trigger any retry.
    fn cancel(&self, alert_id: &str);
}

/// Turns terminal failures into alerts.
pub struct NotificationDispatcher {
    sink: std::sync::Arc<dyn AlertSink>,
}

impl NotificationDispatcher {
    pub fn new(sink: std::sync::Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// Post an alert for a terminal failure if the kind calls for user action.
    ///
    /// Returns the alert that was posted, or `None` for kinds that stay silent.
    pub fn notify(&self, kind: ErrorKind, ctx: &AlertContext) -> Option<Alert> {
        let Some(action) = RecoveryAction::for_kind(kind) else {
            tracing::debug!(photo_id = %ctx.photo_id, %kind, "No alert for this failure kind");
            return None;
        };

        let alert = Alert {
            id: ctx.photo_id.clone(),
            title: "Meal not saved".to_string(),
            message: kind.user_message().to_string(),
            action_label: action.label().to_string(),
            action_ref: action.action_ref().to_string(),
            action,
        };

        tracing::info!(
            photo_id = %ctx.photo_id,
            %kind,
            attempt = ctx.attempt,
            action_ref = action.action_ref(),
            "Posting recovery alert"
        );
        self.sink.post(alert.clone());
        Some(alert)
    }

    /// Dismiss an alert. The photo stays where it is; nothing is retried.
    pub fn dismiss(&self, alert_id: &str) {
        tracing::debug!(alert_id, "Alert dismissed");
        self.sink.cancel(alert_id);
    }
}

/// Alert sink that only logs. Used by the CLI host.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn post(&self, alert: Alert) {
        tracing::warn!(
            alert_id = %alert.id,
            action = %alert.action_label,
            action_ref = %alert.action_ref,
            "{}: {}",
            alert.title,
            alert.message
        );
    }

    fn cancel(&self, alert_id: &str) {
        tracing::info!(alert_id, "Alert cancelled");
    }
}

/// Event delivered by [`ChannelAlertSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    Posted(Alert),
    Cancelled(String),
}

/// Alert sink forwarding events over an unbounded channel to the host UI.
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<AlertEvent>,
}

impl ChannelAlertSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AlertEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn post(&self, alert: Alert) {
        if self.tx.send(AlertEvent::Posted(alert)).is_err() {
            tracing::warn!("Alert receiver dropped; alert discarded");
        }
    }

    fn cancel(&self, alert_id: &str) {
        let _ = self.tx.send(AlertEvent::Cancelled(alert_id.to_string()));
    }
}
