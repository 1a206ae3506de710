use super::INotificationSender;
use obligations_domain::ReminderNotification;
use tracing::info;

/// Used when no webhook is configured
pub struct LogNotificationSender {}

#[async_trait::async_trait]
impl INotificationSender for LogNotificationSender {
    async fn send(&self, notification: &ReminderNotification) -> anyhow::Result<()> {
        info!(
            kind = %notification.kind,
            tenant_id = %notification.tenant_id,
            subject_id = %notification.subject.id,
            "{}",
            notification.metadata.message
        );
        Ok(())
    }
}
