mod inmemory;
mod logger;
mod webhook;

pub use inmemory::InMemoryNotificationSender;
pub use logger::LogNotificationSender;
pub use webhook::{WebhookNotificationSender, WEBHOOK_KEY_HEADER};

use obligations_domain::ReminderNotification;

/// Delivers reminder notifications to the owners of the subjects.
///
/// An `Err` is a retryable failure, the reminder will be released and sent
/// again by a later dispatcher pass.
#[async_trait::async_trait]
pub trait INotificationSender: Send + Sync {
    async fn send(&self, notification: &ReminderNotification) -> anyhow::Result<()>;
}
