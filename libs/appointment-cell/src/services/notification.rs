// libs/appointment-cell/src/services/notification.rs
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentBooked,
    AppointmentUpdated,
    AppointmentApproved,
    AppointmentRejected,
    AppointmentCompleted,
    AppointmentCancelled,
    FollowUpScheduled,
    FollowUpRescheduled,
    FollowUpCompleted,
    FollowUpCancelled,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    /// Appointment or follow-up session the notification is about.
    pub related_id: Uuid,
    pub message: String,
}

/// Outbound notification channel. Delivery is someone else's job; the
/// scheduling core only hands notifications over.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Default sink: writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(
            recipient = %notification.recipient_id,
            kind = ?notification.kind,
            related = %notification.related_id,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Hands a notification to the sink. A failed delivery never fails the request.
pub(crate) async fn dispatch(sink: &dyn NotificationSink, notification: Notification) {
    let kind = notification.kind;
    let related_id = notification.related_id;
    if let Err(e) = sink.notify(notification).await {
        warn!("Failed to deliver {:?} notification for {}: {}", kind, related_id, e);
    }
}
