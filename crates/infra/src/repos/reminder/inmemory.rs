use super::IReminderRepo;
use crate::repos::shared::{inmemory_repo::*, repo::DeleteResult};
use obligations_domain::{DueRemindersQuery, ReminderDocument, ID};

pub struct InMemoryReminderRepo {
    reminders: std::sync::Mutex<Vec<ReminderDocument>>,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: std::sync::Mutex::new(Vec::new()),
        }
    }
}

fn references_subject(reminder: &ReminderDocument, subject_id: &ID) -> bool {
    reminder.subject_id.as_deref() == Some(subject_id.as_string().as_str())
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn bulk_insert(&self, reminders: &[ReminderDocument]) -> anyhow::Result<()> {
        insert_many(reminders, &self.reminders);
        Ok(())
    }

    async fn find(&self, reminder_id: &ID) -> Option<ReminderDocument> {
        find(reminder_id, &self.reminders)
    }

    async fn find_by_subject(&self, subject_id: &ID) -> anyhow::Result<Vec<ReminderDocument>> {
        Ok(find_by(&self.reminders, |r| references_subject(r, subject_id)))
    }

    async fn find_due(&self, query: &DueRemindersQuery) -> anyhow::Result<Vec<ReminderDocument>> {
        let mut reminders = find_by(&self.reminders, |r| query.matches(r));
        reminders.sort_by_key(|r| (r.trigger_date, r.created_at));
        Ok(reminders)
    }

    async fn try_claim(
        &self,
        reminder_id: &ID,
        query: &DueRemindersQuery,
        now: i64,
    ) -> anyhow::Result<Option<u32>> {
        Ok(update_first_where(
            &self.reminders,
            |r| &r.id == reminder_id && query.matches(r),
            |r| {
                r.processing_at = Some(now);
                r.attempt_count = r.attempt_count.saturating_add(1);
                r.attempt_count
            },
        ))
    }

    async fn mark_sent(&self, reminder_id: &ID, sent_at: i64) -> anyhow::Result<u64> {
        Ok(update_where(
            &self.reminders,
            |r| &r.id == reminder_id && !r.sent,
            |r| {
                r.sent = true;
                r.sent_at = Some(sent_at);
            },
        ))
    }

    async fn mark_terminal(
        &self,
        reminder_id: &ID,
        claimed_at: i64,
        sent_error: &str,
        at: i64,
    ) -> anyhow::Result<u64> {
        Ok(update_where(
            &self.reminders,
            |r| &r.id == reminder_id && !r.sent && r.processing_at == Some(claimed_at),
            |r| {
                r.sent = true;
                r.sent_at = Some(at);
                r.sent_error = Some(sent_error.to_string());
            },
        ))
    }

    async fn mark_failed(
        &self,
        reminder_id: &ID,
        claimed_at: i64,
        last_error: &str,
    ) -> anyhow::Result<u64> {
        Ok(update_where(
            &self.reminders,
            |r| &r.id == reminder_id && !r.sent && r.processing_at == Some(claimed_at),
            |r| {
                r.processing_at = None;
                r.last_error = Some(last_error.to_string());
            },
        ))
    }

    async fn delete_unsent_by_subject(&self, subject_id: &ID) -> anyhow::Result<DeleteResult> {
        Ok(delete_by(&self.reminders, |r| {
            !r.sent && references_subject(r, subject_id)
        }))
    }
}
