mod reminder;
mod shared;
mod subject;

pub use reminder::{IReminderRepo, InMemoryReminderRepo, MongoReminderRepo};
pub use shared::repo::DeleteResult;
pub use subject::{ISubjectRepo, InMemorySubjectRepo, MongoSubjectRepo};

use mongodb::{bson::doc, options::ClientOptions, Client};
use obligations_domain::SubjectKind;
use std::sync::Arc;
use tracing::info;

/// One reminder store and one subject store per `SubjectKind`
#[derive(Clone)]
pub struct Repos {
    pub subscription_reminders: Arc<dyn IReminderRepo>,
    pub compliance_reminders: Arc<dyn IReminderRepo>,
    pub subscriptions: Arc<dyn ISubjectRepo>,
    pub compliances: Arc<dyn ISubjectRepo>,
}

impl Repos {
    pub async fn create_mongodb(
        connection_string: &str,
        db_name: &str,
        business_utc_offset_minutes: i32,
    ) -> anyhow::Result<Self> {
        let client_options = ClientOptions::parse(connection_string).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        // Make sure that the db is reachable before any pass starts
        info!("DB CHECKING CONNECTION ...");
        db.run_command(doc! { "ping": 1 }, None).await?;
        info!("DB CHECKING CONNECTION ... [done]");

        Ok(Self {
            subscription_reminders: Arc::new(MongoReminderRepo::new(
                &db,
                SubjectKind::Subscription,
            )),
            compliance_reminders: Arc::new(MongoReminderRepo::new(&db, SubjectKind::Compliance)),
            subscriptions: Arc::new(MongoSubjectRepo::new(
                &db,
                SubjectKind::Subscription,
                business_utc_offset_minutes,
            )),
            compliances: Arc::new(MongoSubjectRepo::new(
                &db,
                SubjectKind::Compliance,
                business_utc_offset_minutes,
            )),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            subscription_reminders: Arc::new(InMemoryReminderRepo::new()),
            compliance_reminders: Arc::new(InMemoryReminderRepo::new()),
            subscriptions: Arc::new(InMemorySubjectRepo::new(SubjectKind::Subscription)),
            compliances: Arc::new(InMemorySubjectRepo::new(SubjectKind::Compliance)),
        }
    }

    pub fn reminders(&self, kind: SubjectKind) -> &Arc<dyn IReminderRepo> {
        match kind {
            SubjectKind::Subscription => &self.subscription_reminders,
            SubjectKind::Compliance => &self.compliance_reminders,
        }
    }

    pub fn subjects(&self, kind: SubjectKind) -> &Arc<dyn ISubjectRepo> {
        match kind {
            SubjectKind::Subscription => &self.subscriptions,
            SubjectKind::Compliance => &self.compliances,
        }
    }
}
