use super::INotificationSender;
use crate::config::NotificationWebhookConfig;
use obligations_domain::ReminderNotification;
use reqwest::{Client, Request};
use std::time::Duration;
use tracing::error;

pub const WEBHOOK_KEY_HEADER: &str = "obligations-webhook-key";

/// POSTs every notification as JSON to the configured url
pub struct WebhookNotificationSender {
    client: Client,
    config: NotificationWebhookConfig,
}

impl WebhookNotificationSender {
    pub fn new(config: NotificationWebhookConfig) -> anyhow::Result<Self> {
        // Well below the staleness window so that a hanging receiver
        // does not let another pass claim the reminder while we wait
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, config })
    }

    fn request(&self, notification: &ReminderNotification) -> reqwest::Result<Request> {
        self.client
            .post(&self.config.url)
            .header(WEBHOOK_KEY_HEADER, &self.config.key)
            .json(notification)
            .build()
    }
}

#[async_trait::async_trait]
impl INotificationSender for WebhookNotificationSender {
    async fn send(&self, notification: &ReminderNotification) -> anyhow::Result<()> {
        let request = self.request(notification)?;
        let res = self.client.execute(request).await.map_err(|e| {
            error!(
                "[Network Error] Notification webhook POST error. Error message: {:?}",
                e
            );
            anyhow::Error::new(e)
        })?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("Notification webhook responded with status {}", status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obligations_domain::{ReminderDocument, ReminderPolicy, Subject, SubjectKind};

    #[test]
    fn posts_notification_as_json_with_key() {
        let sender = WebhookNotificationSender::new(NotificationWebhookConfig {
            url: "https://hooks.example.com/reminders".into(),
            key: "secret".into(),
        })
        .unwrap();

        let mut subject = Subject::new(SubjectKind::Subscription, "tenant".into());
        subject.name = Some("Acme CRM".into());
        subject.deadline = Some("2025-03-10".parse().unwrap());
        let date = "2025-03-03".parse().unwrap();
        let reminder = ReminderDocument::new(&subject, ReminderPolicy::OneTime, date, 0);
        let notification = ReminderNotification::new(&reminder, subject, date);

        let request = sender.request(&notification).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://hooks.example.com/reminders");
        assert_eq!(request.headers()[WEBHOOK_KEY_HEADER], "secret");
        assert_eq!(
            request.headers()[reqwest::header::CONTENT_TYPE],
            "application/json"
        );

        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["kind"], "subscription_reminder");
        assert_eq!(json["tenantId"], "tenant");
        assert_eq!(json["metadata"]["triggerDate"], "2025-03-03");
        assert_eq!(json["metadata"]["reminderPolicy"], "One time");
        assert_eq!(
            json["metadata"]["message"],
            "Reminder: \"Acme CRM\" is due on 2025-03-10."
        );
    }
}
