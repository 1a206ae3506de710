use crate::shared::usecase::UseCase;
use obligations_domain::{
    coerce_reminder_days, generate_trigger_dates, CalendarDate, ReminderDocument, Subject,
};
use obligations_infra::ObligationsContext;
use tracing::{error, info};

/// Regenerates the unsent `ReminderDocument`s of a `Subject`.
///
/// Run whenever the deadline, the policy or the reminder days of a subject
/// have changed. Reminders which have already been sent are left alone.
#[derive(Debug)]
pub struct SyncSubjectRemindersUseCase {
    pub subject: Subject,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
    MissingTenant,
}

#[async_trait::async_trait(?Send)]
impl UseCase for SyncSubjectRemindersUseCase {
    type Response = Vec<ReminderDocument>;

    type Error = UseCaseError;

    const NAME: &'static str = "SyncSubjectReminders";

    async fn execute(&mut self, ctx: &ObligationsContext) -> Result<Self::Response, Self::Error> {
        let subject = &self.subject;
        if subject.tenant_id.trim().is_empty() {
            return Err(UseCaseError::MissingTenant);
        }

        let now = ctx.sys.get_timestamp_millis();
        let today = CalendarDate::at_offset(now, ctx.config.business_utc_offset_minutes);
        let repo = ctx.repos.reminders(subject.kind);

        repo.delete_unsent_by_subject(&subject.id)
            .await
            .map_err(|e| {
                error!(
                    "Unable to delete unsent reminders of {} {}. Err: {:?}",
                    subject.kind, subject.id, e
                );
                UseCaseError::StorageError
            })?;

        let policy = match subject.reminder_policy {
            Some(policy) => policy,
            None => {
                info!("{} {} has no reminder policy", subject.kind, subject.id);
                return Ok(vec![]);
            }
        };
        let deadline = match subject.resolve_deadline() {
            Some(deadline) => deadline,
            None => {
                info!("{} {} has no deadline", subject.kind, subject.id);
                return Ok(vec![]);
            }
        };

        let reminder_days = coerce_reminder_days(
            subject.reminder_days.as_deref(),
            ctx.config.default_reminder_days.for_policy(policy),
        );
        let reminders = generate_trigger_dates(deadline, policy, reminder_days, today)
            .into_iter()
            .map(|trigger_date| ReminderDocument::new(subject, policy, trigger_date, now))
            .collect::<Vec<_>>();

        repo.bulk_insert(&reminders).await.map_err(|e| {
            error!(
                "Unable to store reminders of {} {}. Err: {:?}",
                subject.kind, subject.id, e
            );
            UseCaseError::StorageError
        })?;

        Ok(reminders)
    }
}
