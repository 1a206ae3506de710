use super::IReminderRepo;
use crate::repos::shared::{
    mongo_repo::{self, MongoDocument},
    repo::DeleteResult,
};
use futures::stream::StreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, DateTime, Document},
    options::FindOptions,
    Collection, Database,
};
use obligations_domain::{DueRemindersQuery, ReminderDocument, SubjectKind, ID};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use tracing::{error, warn};

pub struct MongoReminderRepo {
    collection: Collection<Document>,
    kind: SubjectKind,
}

impl MongoReminderRepo {
    pub fn new(db: &Database, kind: SubjectKind) -> Self {
        let collection_name = match kind {
            SubjectKind::Subscription => "subscriptionreminders",
            SubjectKind::Compliance => "compliancereminders",
        };
        Self {
            collection: db.collection(collection_name),
            kind,
        }
    }

    fn subject_filter(&self, subject_id: &ID) -> Document {
        // The reference may have been written as an ObjectId or as its hex string
        let mut filter = Document::new();
        filter.insert(
            self.kind.id_field(),
            doc! { "$in": [subject_id.inner_ref().clone(), subject_id.as_string()] },
        );
        filter
    }

    /// Takes a document that cannot be read out of rotation
    async fn quarantine(&self, doc: &Document, reason: &anyhow::Error) {
        let oid = match doc.get_object_id("_id") {
            Ok(oid) => oid,
            Err(_) => {
                error!(
                    "Skipping unreadable reminder document without an _id: {:?}",
                    reason
                );
                return;
            }
        };
        warn!("Quarantining malformed reminder document {}: {:?}", oid, reason);

        let filter = doc! {
            "_id": oid,
            "sent": { "$ne": true },
        };
        let update = quarantine_update(reason, DateTime::now());
        if let Err(e) = mongo_repo::update_one(&self.collection, filter, update).await {
            error!("Unable to quarantine reminder document {}: {:?}", oid, e);
        }
    }
}

fn reminder_from_document(doc: Document, kind: SubjectKind) -> anyhow::Result<ReminderDocument> {
    let raw: ReminderMongo = bson::from_document(doc)?;
    raw.into_domain(kind)
}

fn quarantine_update(reason: &anyhow::Error, at: DateTime) -> Document {
    doc! {
        "$set": {
            "sent": true,
            "sentAt": at,
            "sentError": format!("malformed reminder document: {}", reason),
        }
    }
}

fn due_filter(query: &DueRemindersQuery) -> Document {
    // Dates written with a time suffix (`2025-03-10T00:00:00.000Z`) sort after
    // the bare day, so they are bounded by the next day instead
    let trigger_date_bound = match query.today.succ() {
        Some(next_day) => doc! { "$lt": next_day.to_string() },
        None => doc! { "$lte": query.today.to_string() },
    };
    let mut filter = doc! {
        "sent": { "$ne": true },
        "reminderTriggerDate": trigger_date_bound,
        "$or": [
            { "processingAt": null },
            { "processingAt": { "$lt": DateTime::from_millis(query.stale_before) } },
        ],
    };
    if let Some(tenant_id) = &query.tenant_id {
        filter.insert("tenantId", tenant_id.clone());
    }
    filter
}

#[async_trait::async_trait]
impl IReminderRepo for MongoReminderRepo {
    async fn bulk_insert(&self, reminders: &[ReminderDocument]) -> anyhow::Result<()> {
        mongo_repo::bulk_insert::<_, ReminderMongo>(&self.collection, reminders).await
    }

    async fn find(&self, reminder_id: &ID) -> Option<ReminderDocument> {
        let filter = mongo_repo::get_id_filter(reminder_id.inner_ref());
        match self.collection.find_one(filter, None).await {
            Ok(Some(doc)) => match reminder_from_document(doc, self.kind) {
                Ok(reminder) => Some(reminder),
                Err(e) => {
                    error!("Unable to read reminder {}: {:?}", reminder_id, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!("Unable to find reminder {}: {:?}", reminder_id, e);
                None
            }
        }
    }

    async fn find_by_subject(&self, subject_id: &ID) -> anyhow::Result<Vec<ReminderDocument>> {
        let filter = self.subject_filter(subject_id);
        let options = FindOptions::builder()
            .sort(doc! { "reminderTriggerDate": 1, "createdAt": 1 })
            .build();
        let mut cursor = self.collection.find(filter, options).await?;

        let mut reminders = Vec::new();
        while let Some(doc) = cursor.next().await {
            match reminder_from_document(doc?, self.kind) {
                Ok(reminder) => reminders.push(reminder),
                Err(e) => error!("Unable to read reminder of subject {}: {:?}", subject_id, e),
            }
        }
        Ok(reminders)
    }

    async fn find_due(&self, query: &DueRemindersQuery) -> anyhow::Result<Vec<ReminderDocument>> {
        let options = FindOptions::builder()
            .sort(doc! { "reminderTriggerDate": 1, "createdAt": 1 })
            .build();
        let mut cursor = self.collection.find(due_filter(query), options).await?;

        let mut reminders = Vec::new();
        let mut malformed = Vec::new();
        while let Some(doc) = cursor.next().await {
            let doc = doc?;
            match reminder_from_document(doc.clone(), self.kind) {
                Ok(reminder) => reminders.push(reminder),
                Err(e) => malformed.push((doc, e)),
            }
        }
        for (doc, reason) in &malformed {
            self.quarantine(doc, reason).await;
        }

        Ok(reminders)
    }

    async fn try_claim(
        &self,
        reminder_id: &ID,
        query: &DueRemindersQuery,
        now: i64,
    ) -> anyhow::Result<Option<u32>> {
        let mut filter = due_filter(query);
        filter.insert("_id", reminder_id.inner_ref().clone());
        let update = doc! {
            "$set": { "processingAt": DateTime::from_millis(now) },
            "$inc": { "attemptCount": 1 },
        };
        let projection = doc! { "attemptCount": 1 };
        let claimed =
            mongo_repo::update_one_returning(&self.collection, filter, update, projection).await?;
        Ok(claimed.map(|doc| bson_to_attempt_count(doc.get("attemptCount"))))
    }

    async fn mark_sent(&self, reminder_id: &ID, sent_at: i64) -> anyhow::Result<u64> {
        let filter = doc! {
            "_id": reminder_id.inner_ref().clone(),
            "sent": { "$ne": true },
        };
        let update = doc! {
            "$set": {
                "sent": true,
                "sentAt": DateTime::from_millis(sent_at),
            }
        };
        mongo_repo::update_one(&self.collection, filter, update).await
    }

    async fn mark_terminal(
        &self,
        reminder_id: &ID,
        claimed_at: i64,
        sent_error: &str,
        at: i64,
    ) -> anyhow::Result<u64> {
        let filter = doc! {
            "_id": reminder_id.inner_ref().clone(),
            "sent": { "$ne": true },
            "processingAt": DateTime::from_millis(claimed_at),
        };
        let update = doc! {
            "$set": {
                "sent": true,
                "sentAt": DateTime::from_millis(at),
                "sentError": sent_error,
            }
        };
        mongo_repo::update_one(&self.collection, filter, update).await
    }

    async fn mark_failed(
        &self,
        reminder_id: &ID,
        claimed_at: i64,
        last_error: &str,
    ) -> anyhow::Result<u64> {
        // Only release the claim this worker holds
        let filter = doc! {
            "_id": reminder_id.inner_ref().clone(),
            "sent": { "$ne": true },
            "processingAt": DateTime::from_millis(claimed_at),
        };
        let update = doc! {
            "$set": { "lastError": last_error },
            "$unset": { "processingAt": "" },
        };
        mongo_repo::update_one(&self.collection, filter, update).await
    }

    async fn delete_unsent_by_subject(&self, subject_id: &ID) -> anyhow::Result<DeleteResult> {
        let mut filter = self.subject_filter(subject_id);
        filter.insert("sent", doc! { "$ne": true });
        mongo_repo::delete_many_by(&self.collection, filter).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderMongo {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default)]
    tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subscription_id: Option<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compliance_id: Option<Bson>,
    reminder_policy: String,
    #[serde(default)]
    reminder_type: Option<String>,
    reminder_trigger_date: String,
    #[serde(default)]
    sent: bool,
    #[serde(default)]
    processing_at: Option<DateTime>,
    #[serde(default)]
    attempt_count: Option<Bson>,
    #[serde(default)]
    last_error: Option<String>,
    #[serde(default)]
    sent_error: Option<String>,
    #[serde(default)]
    sent_at: Option<DateTime>,
    #[serde(default)]
    created_at: Option<DateTime>,
}

/// Any non null reference is kept, validity is decided by the dispatcher
fn reference_to_string(reference: Option<Bson>) -> Option<String> {
    match reference? {
        Bson::Null | Bson::Undefined => None,
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// `$inc` keeps whatever numeric type the writer used
fn bson_to_attempt_count(count: Option<&Bson>) -> u32 {
    let count = match count {
        Some(Bson::Int32(count)) => i64::from(*count),
        Some(Bson::Int64(count)) => *count,
        Some(Bson::Double(count)) if count.is_finite() => *count as i64,
        _ => 0,
    };
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

fn string_to_reference(reference: &Option<String>) -> Option<Bson> {
    let reference = reference.as_ref()?;
    Some(match ObjectId::parse_str(reference) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(reference.clone()),
    })
}

impl ReminderMongo {
    fn into_domain(self, kind: SubjectKind) -> anyhow::Result<ReminderDocument> {
        let subject_id = match kind {
            SubjectKind::Subscription => self.subscription_id,
            SubjectKind::Compliance => self.compliance_id,
        };
        let policy = self.reminder_policy.parse()?;
        let attempt_count = bson_to_attempt_count(self.attempt_count.as_ref());

        let object_id = self.id;
        Ok(ReminderDocument {
            id: ID::from(self.id),
            tenant_id: self.tenant_id.unwrap_or_default(),
            subject_kind: kind,
            subject_id: reference_to_string(subject_id),
            policy,
            reminder_type: self
                .reminder_type
                .unwrap_or_else(|| policy.reminder_type().to_string()),
            trigger_date: self.reminder_trigger_date.parse()?,
            sent: self.sent,
            processing_at: self.processing_at.map(|dt| dt.timestamp_millis()),
            attempt_count,
            last_error: self.last_error,
            sent_error: self.sent_error,
            sent_at: self.sent_at.map(|dt| dt.timestamp_millis()),
            created_at: self
                .created_at
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| object_id.timestamp().timestamp_millis()),
        })
    }
}

impl MongoDocument<ReminderDocument> for ReminderMongo {
    fn from_domain(reminder: &ReminderDocument) -> Self {
        let subject_id = string_to_reference(&reminder.subject_id);
        let (subscription_id, compliance_id) = match reminder.subject_kind {
            SubjectKind::Subscription => (subject_id, None),
            SubjectKind::Compliance => (None, subject_id),
        };
        Self {
            id: reminder.id.inner_ref().clone(),
            tenant_id: Some(reminder.tenant_id.clone()),
            subscription_id,
            compliance_id,
            reminder_policy: reminder.policy.to_string(),
            reminder_type: Some(reminder.reminder_type.clone()),
            reminder_trigger_date: reminder.trigger_date.to_string(),
            sent: reminder.sent,
            processing_at: reminder.processing_at.map(DateTime::from_millis),
            attempt_count: Some(Bson::Int64(i64::from(reminder.attempt_count))),
            last_error: reminder.last_error.clone(),
            sent_error: reminder.sent_error.clone(),
            sent_at: reminder.sent_at.map(DateTime::from_millis),
            created_at: Some(DateTime::from_millis(reminder.created_at)),
        }
    }
}
