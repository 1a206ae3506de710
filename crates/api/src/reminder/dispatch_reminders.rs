use crate::shared::usecase::UseCase;
use obligations_domain::{
    CalendarDate, DueRemindersQuery, ReminderDocument, ReminderNotification, SubjectKind,
};
use obligations_infra::{IReminderRepo, ObligationsContext};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Runs one dispatcher pass over the due reminders of every `SubjectKind`.
///
/// Any number of passes may run at the same time, in this process or in
/// others. A reminder is only sent by the pass that claimed it, and a claim
/// which is not resolved within the staleness window is taken over by a
/// later pass. Delivery is therefore at least once.
#[derive(Debug, Default)]
pub struct DispatchRemindersUseCase {
    /// Restricts the pass to the reminders of one tenant
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchSummary {
    /// Reminders claimed by this pass
    pub processed: usize,
    pub sent: usize,
    /// Reminders claimed by someone else first
    pub skipped: usize,
    /// Reminders which could not be sent, including terminal failures
    pub errors: usize,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError(SubjectKind),
}

/// How a single claimed reminder was resolved
#[derive(Debug, PartialEq)]
enum Outcome {
    Sent,
    Released,
    Terminated,
}

/// A claim held by this pass
struct Claim {
    /// The `processingAt` written by the claim
    claimed_at: i64,
    /// Stored attempt count including this claim
    attempt: u32,
}

struct Pass<'a> {
    ctx: &'a ObligationsContext,
    query: DueRemindersQuery,
}

impl<'a> Pass<'a> {
    fn new(ctx: &'a ObligationsContext, tenant_id: Option<String>) -> Self {
        let now = ctx.sys.get_timestamp_millis();
        let query = DueRemindersQuery {
            today: CalendarDate::at_offset(now, ctx.config.business_utc_offset_minutes),
            stale_before: now - ctx.config.reminder_stale_after_millis,
            tenant_id,
        };
        Self { ctx, query }
    }

    #[tracing::instrument(name = "Dispatching reminders", skip(self, summary))]
    async fn run(
        &self,
        kind: SubjectKind,
        summary: &mut DispatchSummary,
    ) -> Result<(), UseCaseError> {
        let repo = self.ctx.repos.reminders(kind);
        let due = repo.find_due(&self.query).await.map_err(|e| {
            error!("Unable to query due {} reminders. Err: {:?}", kind, e);
            UseCaseError::StorageError(kind)
        })?;
        if !due.is_empty() {
            info!("Found {} due {} reminders", due.len(), kind);
        }

        for reminder in due {
            // Earlier sends of this pass may have taken a while, the claim
            // has to be stamped with the time it is actually made
            let claimed_at = self.ctx.sys.get_timestamp_millis();
            let claim = match repo.try_claim(&reminder.id, &self.query, claimed_at).await {
                Ok(Some(attempt)) => Claim { claimed_at, attempt },
                Ok(None) => {
                    debug!("Reminder {} was claimed by another dispatcher", reminder.id);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Unable to claim reminder {}. Err: {:?}", reminder.id, e);
                    summary.errors += 1;
                    continue;
                }
            };
            summary.processed += 1;

            match self.dispatch(repo.as_ref(), &reminder, &claim).await {
                Outcome::Sent => summary.sent += 1,
                Outcome::Released | Outcome::Terminated => summary.errors += 1,
            }
        }

        Ok(())
    }

    async fn dispatch(
        &self,
        repo: &dyn IReminderRepo,
        reminder: &ReminderDocument,
        claim: &Claim,
    ) -> Outcome {
        let target = match reminder.target() {
            Ok(target) => target,
            Err(e) => return self.terminate(repo, reminder, claim, &e.to_string()).await,
        };

        let subjects = self.ctx.repos.subjects(reminder.subject_kind);
        let subject = match subjects.find_one(&target.subject_id, &target.tenant_id).await {
            Ok(Some(subject)) => subject,
            Ok(None) => {
                let reason = format!("{} not found", reminder.subject_kind);
                return self.terminate(repo, reminder, claim, &reason).await;
            }
            Err(e) => {
                let reason = format!("Unable to load {}: {}", reminder.subject_kind, e);
                return self.fail(repo, reminder, claim, &reason).await;
            }
        };

        let notification = ReminderNotification::new(reminder, subject, self.query.today);
        if let Err(e) = self.ctx.notifier.send(&notification).await {
            let reason = format!("Unable to send notification: {}", e);
            return self.fail(repo, reminder, claim, &reason).await;
        }

        match repo.mark_sent(&reminder.id, self.ctx.sys.get_timestamp_millis()).await {
            Ok(0) => warn!(
                "Reminder {} was completed by another dispatcher while it was being sent",
                reminder.id
            ),
            Ok(_) => {}
            // The notification is out, a later pass may send it again
            Err(e) => error!("Unable to mark reminder {} as sent. Err: {:?}", reminder.id, e),
        }
        Outcome::Sent
    }

    /// Retryable failure, releases the claim unless the attempts are used up
    async fn fail(
        &self,
        repo: &dyn IReminderRepo,
        reminder: &ReminderDocument,
        claim: &Claim,
        reason: &str,
    ) -> Outcome {
        if let Some(max_attempts) = self.ctx.config.reminder_max_attempts {
            if claim.attempt >= max_attempts {
                let reason = format!("gave up after {} attempts: {}", claim.attempt, reason);
                return self.terminate(repo, reminder, claim, &reason).await;
            }
        }

        warn!(
            "Reminder {} failed on attempt {}: {}",
            reminder.id, claim.attempt, reason
        );
        match repo.mark_failed(&reminder.id, claim.claimed_at, reason).await {
            Ok(0) => info!(
                "Claim of reminder {} was taken over before it could be released",
                reminder.id
            ),
            Ok(_) => {}
            // The claim will go stale
            Err(e) => error!("Unable to release reminder {}. Err: {:?}", reminder.id, e),
        }
        Outcome::Released
    }

    async fn terminate(
        &self,
        repo: &dyn IReminderRepo,
        reminder: &ReminderDocument,
        claim: &Claim,
        reason: &str,
    ) -> Outcome {
        warn!("Giving up on reminder {}: {}", reminder.id, reason);
        let at = self.ctx.sys.get_timestamp_millis();
        match repo
            .mark_terminal(&reminder.id, claim.claimed_at, reason, at)
            .await
        {
            Ok(0) => info!(
                "Claim of reminder {} was taken over before it could be given up on",
                reminder.id
            ),
            Ok(_) => {}
            Err(e) => error!("Unable to mark reminder {} as terminal. Err: {:?}", reminder.id, e),
        }
        Outcome::Terminated
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DispatchRemindersUseCase {
    type Response = DispatchSummary;

    type Error = UseCaseError;

    const NAME: &'static str = "DispatchReminders";

    async fn execute(&mut self, ctx: &ObligationsContext) -> Result<Self::Response, Self::Error> {
        let pass = Pass::new(ctx, self.tenant_id.clone());
        let mut summary = DispatchSummary::default();
        for kind in SubjectKind::ALL.iter() {
            pass.run(*kind, &mut summary).await?;
        }

        info!(
            processed = summary.processed,
            sent = summary.sent,
            skipped = summary.skipped,
            errors = summary.errors,
            "Reminder dispatch finished for {}",
            pass.query.today
        );
        Ok(summary)
    }
}
