mod inmemory;
mod mongo;

pub use inmemory::InMemoryReminderRepo;
pub use mongo::MongoReminderRepo;

use crate::repos::shared::repo::DeleteResult;
use obligations_domain::{DueRemindersQuery, ReminderDocument, ID};

/// Store of `ReminderDocument`s for one `SubjectKind`.
///
/// Every mutation is a single conditional update and returns the number of
/// matched documents. A matched count of 0 means the condition no longer held,
/// e.g. another dispatcher claimed or completed the document first.
#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    async fn bulk_insert(&self, reminders: &[ReminderDocument]) -> anyhow::Result<()>;
    async fn find(&self, reminder_id: &ID) -> Option<ReminderDocument>;
    async fn find_by_subject(&self, subject_id: &ID) -> anyhow::Result<Vec<ReminderDocument>>;
    /// Reminders matching `query`, oldest trigger date first and then oldest created first
    async fn find_due(&self, query: &DueRemindersQuery) -> anyhow::Result<Vec<ReminderDocument>>;
    /// Sets `processingAt = now` and increments `attemptCount` iff the reminder
    /// still matches `query`. Returns the stored `attemptCount` after the claim,
    /// or `None` when nothing matched.
    async fn try_claim(
        &self,
        reminder_id: &ID,
        query: &DueRemindersQuery,
        now: i64,
    ) -> anyhow::Result<Option<u32>>;
    async fn mark_sent(&self, reminder_id: &ID, sent_at: i64) -> anyhow::Result<u64>;
    /// Gives up on the reminder for good. Like `mark_failed` this only matches
    /// while the claim made at `claimed_at` is still held.
    async fn mark_terminal(
        &self,
        reminder_id: &ID,
        claimed_at: i64,
        sent_error: &str,
        at: i64,
    ) -> anyhow::Result<u64>;
    /// Releases the claim made at `claimed_at` and records `last_error`.
    /// Matches nothing if the reminder has been claimed again since.
    async fn mark_failed(
        &self,
        reminder_id: &ID,
        claimed_at: i64,
        last_error: &str,
    ) -> anyhow::Result<u64>;
    async fn delete_unsent_by_subject(&self, subject_id: &ID) -> anyhow::Result<DeleteResult>;
}

#[cfg(test)]
mod tests {
    use crate::{setup_context, ObligationsContext};
    use obligations_domain::{
        CalendarDate, DueRemindersQuery, ReminderDocument, ReminderPolicy, Subject, SubjectKind,
    };

    /// Creates inmemory and mongo context when mongo is configured,
    /// otherwise it will create two inmemory
    async fn create_contexts() -> Vec<ObligationsContext> {
        vec![
            ObligationsContext::create_inmemory(),
            setup_context().await.expect("To set up context"),
        ]
    }

    fn date(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    fn query(today: &str, stale_before: i64) -> DueRemindersQuery {
        DueRemindersQuery {
            today: date(today),
            stale_before,
            tenant_id: None,
        }
    }

    fn subject(tenant_id: &str) -> Subject {
        Subject::new(SubjectKind::Compliance, tenant_id.into())
    }

    #[tokio::test]
    async fn finds_due_reminders_in_order() {
        for ctx in create_contexts().await {
            let repo = ctx.repos.reminders(SubjectKind::Compliance);
            let s1 = subject("tenant-1");
            let s2 = subject("tenant-2");
            let reminders = vec![
                ReminderDocument::new(&s1, ReminderPolicy::OneTime, date("2025-03-03"), 20),
                ReminderDocument::new(&s2, ReminderPolicy::OneTime, date("2025-03-02"), 30),
                ReminderDocument::new(&s2, ReminderPolicy::OneTime, date("2025-03-03"), 10),
                // Not due yet
                ReminderDocument::new(&s1, ReminderPolicy::OneTime, date("2025-03-04"), 0),
            ];
            assert!(repo.bulk_insert(&reminders).await.is_ok());

            let inserted = reminders.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
            let due = repo.find_due(&query("2025-03-03", 0)).await.unwrap();
            let due = due
                .into_iter()
                .map(|r| r.id)
                .filter(|id| inserted.contains(id))
                .collect::<Vec<_>>();
            assert_eq!(
                due,
                vec![
                    reminders[1].id.clone(),
                    reminders[2].id.clone(),
                    reminders[0].id.clone()
                ]
            );

            let mut tenant_query = query("2025-03-03", 0);
            tenant_query.tenant_id = Some("tenant-1".into());
            let due = repo.find_due(&tenant_query).await.unwrap();
            assert!(due.iter().all(|r| r.tenant_id == "tenant-1"));
            assert!(due.iter().any(|r| r.id == reminders[0].id));
        }
    }

    #[tokio::test]
    async fn only_one_claim_wins() {
        for ctx in create_contexts().await {
            let repo = ctx.repos.reminders(SubjectKind::Compliance);
            let reminder = ReminderDocument::new(
                &subject("tenant"),
                ReminderPolicy::OneTime,
                date("2025-03-03"),
                0,
            );
            repo.bulk_insert(&[reminder.clone()]).await.unwrap();

            let q = query("2025-03-03", 500);
            let (first, second) = futures::join!(
                repo.try_claim(&reminder.id, &q, 1000),
                repo.try_claim(&reminder.id, &q, 1000)
            );
            let mut claims = vec![first.unwrap(), second.unwrap()];
            claims.sort();
            assert_eq!(claims, vec![None, Some(1)]);

            let claimed = repo.find(&reminder.id).await.unwrap();
            assert_eq!(claimed.processing_at, Some(1000));
            assert_eq!(claimed.attempt_count, 1);

            assert_eq!(repo.mark_sent(&reminder.id, 1100).await.unwrap(), 1);
            // Terminal
            let later = query("2025-03-03", 5000);
            assert_eq!(repo.try_claim(&reminder.id, &later, 5000).await.unwrap(), None);
            assert_eq!(repo.mark_sent(&reminder.id, 1200).await.unwrap(), 0);
            let res = repo.mark_terminal(&reminder.id, 1000, "late", 1200).await;
            assert_eq!(res.unwrap(), 0);

            let sent = repo.find(&reminder.id).await.unwrap();
            assert!(sent.sent);
            assert_eq!(sent.sent_at, Some(1100));
            assert_eq!(sent.sent_error, None);
        }
    }

    #[tokio::test]
    async fn stale_claims_can_be_reclaimed() {
        for ctx in create_contexts().await {
            let repo = ctx.repos.reminders(SubjectKind::Compliance);
            let reminder = ReminderDocument::new(
                &subject("tenant"),
                ReminderPolicy::OneTime,
                date("2025-03-03"),
                0,
            );
            repo.bulk_insert(&[reminder.clone()]).await.unwrap();

            let claim = |stale_before: i64, now: i64| {
                let q = query("2025-03-03", stale_before);
                let id = reminder.id.clone();
                let repo = repo.clone();
                async move { repo.try_claim(&id, &q, now).await.unwrap() }
            };
            assert_eq!(claim(0, 1000).await, Some(1));
            // Claim is still fresh
            assert_eq!(claim(1000, 2000).await, None);
            // Claim is stale
            assert_eq!(claim(1001, 3000).await, Some(2));

            let reclaimed = repo.find(&reminder.id).await.unwrap();
            assert_eq!(reclaimed.processing_at, Some(3000));
            assert_eq!(reclaimed.attempt_count, 2);

            // The first worker can no longer release the claim
            assert_eq!(repo.mark_failed(&reminder.id, 1000, "timeout").await.unwrap(), 0);
            assert_eq!(repo.mark_failed(&reminder.id, 3000, "timeout").await.unwrap(), 1);

            let released = repo.find(&reminder.id).await.unwrap();
            assert_eq!(released.processing_at, None);
            assert_eq!(released.attempt_count, 2);
            assert_eq!(released.last_error, Some("timeout".into()));
            assert!(!released.sent);
        }
    }

    #[tokio::test]
    async fn terminal_keeps_the_error() {
        for ctx in create_contexts().await {
            let repo = ctx.repos.reminders(SubjectKind::Compliance);
            let reminder = ReminderDocument::new(
                &subject("tenant"),
                ReminderPolicy::TwoTimes,
                date("2025-03-03"),
                0,
            );
            repo.bulk_insert(&[reminder.clone()]).await.unwrap();
            let q = query("2025-03-03", 0);
            assert_eq!(repo.try_claim(&reminder.id, &q, 10).await.unwrap(), Some(1));

            // Someone else's claim
            let res = repo.mark_terminal(&reminder.id, 5, "subject not found", 50).await;
            assert_eq!(res.unwrap(), 0);
            assert!(!repo.find(&reminder.id).await.unwrap().sent);

            let res = repo.mark_terminal(&reminder.id, 10, "subject not found", 50).await;
            assert_eq!(res.unwrap(), 1);
            let terminal = repo.find(&reminder.id).await.unwrap();
            assert!(terminal.sent);
            assert_eq!(terminal.sent_error, Some("subject not found".into()));

            let due = repo.find_due(&query("2025-03-03", 0)).await.unwrap();
            assert!(due.iter().all(|r| r.id != reminder.id));
        }
    }

    #[tokio::test]
    async fn deletes_unsent_reminders_of_subject() {
        for ctx in create_contexts().await {
            let repo = ctx.repos.reminders(SubjectKind::Compliance);
            let s1 = subject("tenant");
            let s2 = subject("tenant");
            let reminders = vec![
                ReminderDocument::new(&s1, ReminderPolicy::UntilRenewal, date("2025-03-03"), 0),
                ReminderDocument::new(&s1, ReminderPolicy::UntilRenewal, date("2025-03-04"), 0),
                ReminderDocument::new(&s2, ReminderPolicy::UntilRenewal, date("2025-03-04"), 0),
            ];
            repo.bulk_insert(&reminders).await.unwrap();
            repo.mark_sent(&reminders[0].id, 10).await.unwrap();

            let res = repo.delete_unsent_by_subject(&s1.id).await.unwrap();
            assert_eq!(res.deleted_count, 1);

            let remaining = repo.find_by_subject(&s1.id).await.unwrap();
            assert_eq!(remaining.len(), 1);
            assert!(remaining[0].sent);
            assert_eq!(repo.find_by_subject(&s2.id).await.unwrap().len(), 1);
        }
    }
}
