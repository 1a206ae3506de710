#![allow(dead_code)]

use obligations_api::Application;
use obligations_domain::{ReminderPolicy, Subject, SubjectKind};
use obligations_infra::{Config, InMemoryNotificationSender, ManualSys, ObligationsContext};
use std::sync::Arc;

pub struct TestApp {
    pub config: Config,
}

// Launch the application as a background task
pub async fn spawn_app() -> (TestApp, String) {
    let mut ctx = ObligationsContext::create_inmemory();
    ctx.config.port = 0; // Random port

    let config = ctx.config.clone();
    let application = Application::new(ctx)
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    (TestApp { config }, address)
}

/// Timestamp in millis of a RFC3339 datetime
pub fn ts(datetime: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(datetime)
        .expect("Valid RFC3339 datetime")
        .timestamp_millis()
}

/// An in-memory context whose clock only moves when told to and whose
/// notifications are recorded
pub struct DispatchTestContext {
    pub ctx: ObligationsContext,
    pub sys: Arc<ManualSys>,
    pub sender: Arc<InMemoryNotificationSender>,
}

pub fn dispatch_context(now: &str) -> DispatchTestContext {
    let mut ctx = ObligationsContext::create_inmemory();
    let sys = Arc::new(ManualSys::new(ts(now)));
    let sender = Arc::new(InMemoryNotificationSender::new());
    ctx.sys = sys.clone();
    ctx.notifier = sender.clone();
    DispatchTestContext { ctx, sys, sender }
}

pub async fn insert_subject(
    ctx: &ObligationsContext,
    kind: SubjectKind,
    tenant_id: &str,
    name: &str,
    deadline: &str,
    policy: ReminderPolicy,
    reminder_days: &str,
) -> Subject {
    let mut subject = Subject::new(kind, tenant_id.into());
    subject.name = Some(name.into());
    subject.deadline = Some(deadline.parse().expect("Valid date"));
    subject.reminder_policy = Some(policy);
    subject.reminder_days = Some(reminder_days.into());
    ctx.repos
        .subjects(kind)
        .insert(&subject)
        .await
        .expect("To insert subject");
    subject
}
