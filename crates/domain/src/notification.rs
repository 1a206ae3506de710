use crate::{
    date::CalendarDate,
    reminder::{ReminderDocument, ReminderPolicy},
    subject::Subject,
};
use serde::{Deserialize, Serialize};

/// The payload handed to the notification collaborator for a due reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderNotification {
    pub kind: String,
    pub subject: Subject,
    pub tenant_id: String,
    pub metadata: ReminderMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderMetadata {
    pub reminder_type: String,
    /// The business day the reminder was sent on
    pub reminder_date: CalendarDate,
    pub trigger_date: CalendarDate,
    pub reminder_days: Option<String>,
    pub reminder_policy: ReminderPolicy,
    pub deadline: Option<CalendarDate>,
    pub message: String,
}

impl ReminderNotification {
    pub fn new(reminder: &ReminderDocument, subject: Subject, today: CalendarDate) -> Self {
        let deadline = subject.resolve_deadline();
        let message = reminder_message(&subject, deadline);
        Self {
            kind: subject.kind.notification_kind().to_string(),
            tenant_id: subject.tenant_id.clone(),
            metadata: ReminderMetadata {
                reminder_type: reminder.reminder_type.clone(),
                reminder_date: today,
                trigger_date: reminder.trigger_date,
                reminder_days: subject.reminder_days.clone(),
                reminder_policy: reminder.policy,
                deadline,
                message,
            },
            subject,
        }
    }
}

fn reminder_message(subject: &Subject, deadline: Option<CalendarDate>) -> String {
    let name = subject.display_name();
    match deadline {
        Some(deadline) => format!("Reminder: \"{}\" is due on {}.", name, deadline),
        None => format!("Reminder: \"{}\" is due soon.", name),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subject::SubjectKind;

    #[test]
    fn builds_notification_from_reminder_and_subject() {
        let mut subject = Subject::new(SubjectKind::Subscription, "tenant-1".into());
        subject.name = Some("Acme CRM".into());
        subject.deadline = Some("2025-03-10".parse().unwrap());
        subject.reminder_days = Some("7".into());
        let reminder = ReminderDocument::new(
            &subject,
            ReminderPolicy::OneTime,
            "2025-03-03".parse().unwrap(),
            0,
        );

        let notification =
            ReminderNotification::new(&reminder, subject.clone(), "2025-03-04".parse().unwrap());
        assert_eq!(notification.kind, "subscription_reminder");
        assert_eq!(notification.tenant_id, "tenant-1");
        assert_eq!(
            notification.metadata.message,
            "Reminder: \"Acme CRM\" is due on 2025-03-10."
        );
        assert_eq!(notification.metadata.reminder_type, "One time reminder");

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["metadata"]["triggerDate"], "2025-03-03");
        assert_eq!(json["metadata"]["reminderDate"], "2025-03-04");
        assert_eq!(json["metadata"]["reminderPolicy"], "One time");
        assert_eq!(json["subject"]["tenantId"], "tenant-1");
    }
}
