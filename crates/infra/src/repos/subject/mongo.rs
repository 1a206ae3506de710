use super::ISubjectRepo;
use crate::repos::shared::{
    mongo_repo::{self, MongoDocument},
    repo::DeleteResult,
};
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, Document},
    Collection, Database,
};
use obligations_domain::{CalendarDate, ReminderPolicy, Subject, SubjectKind, ID};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub struct MongoSubjectRepo {
    collection: Collection<Document>,
    kind: SubjectKind,
    /// Deadlines stored as datetimes are read as the calendar date at this offset
    business_utc_offset_minutes: i32,
}

impl MongoSubjectRepo {
    pub fn new(db: &Database, kind: SubjectKind, business_utc_offset_minutes: i32) -> Self {
        let collection_name = match kind {
            SubjectKind::Subscription => "subscriptions",
            SubjectKind::Compliance => "compliances",
        };
        Self {
            collection: db.collection(collection_name),
            kind,
            business_utc_offset_minutes,
        }
    }
}

#[async_trait::async_trait]
impl ISubjectRepo for MongoSubjectRepo {
    async fn insert(&self, subject: &Subject) -> anyhow::Result<()> {
        mongo_repo::insert::<_, SubjectMongo>(&self.collection, subject).await
    }

    async fn find_one(&self, subject_id: &ID, tenant_id: &str) -> anyhow::Result<Option<Subject>> {
        let mut tenant_ids = vec![Bson::String(tenant_id.to_string())];
        if let Ok(oid) = ObjectId::parse_str(tenant_id) {
            tenant_ids.push(Bson::ObjectId(oid));
        }
        let filter = doc! {
            "_id": subject_id.inner_ref().clone(),
            "tenantId": { "$in": tenant_ids },
        };
        match self.collection.find_one(filter, None).await? {
            Some(doc) => {
                let raw: SubjectMongo = bson::from_document(doc)?;
                Ok(Some(raw.into_domain(self.kind, self.business_utc_offset_minutes)))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, subject_id: &ID) -> anyhow::Result<DeleteResult> {
        let filter = mongo_repo::get_id_filter(subject_id.inner_ref());
        mongo_repo::delete_many_by(&self.collection, filter).await
    }
}

/// Subjects are written by another application, so every field but the
/// id is read leniently
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectMongo {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default)]
    tenant_id: Option<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deadline: Option<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reminder_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reminder_days: Option<Bson>,
}

fn bson_to_date(value: Option<Bson>, offset_minutes: i32) -> Option<CalendarDate> {
    match value? {
        Bson::Null | Bson::Undefined => None,
        Bson::String(s) if s.trim().is_empty() => None,
        Bson::String(s) => match s.parse() {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("Ignoring invalid date `{}`: {}", s, e);
                None
            }
        },
        Bson::DateTime(dt) => Some(CalendarDate::at_offset(dt.timestamp_millis(), offset_minutes)),
        other => {
            warn!("Ignoring date of unexpected type: {:?}", other);
            None
        }
    }
}

/// The raw value is kept as text and coerced when reminders are generated
fn bson_to_reminder_days(value: Option<Bson>) -> Option<String> {
    match value? {
        Bson::Null | Bson::Undefined => None,
        Bson::String(s) => Some(s),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        Bson::Double(n) => Some(n.to_string()),
        other => {
            warn!("Ignoring reminderDays of unexpected type: {:?}", other);
            None
        }
    }
}

fn parse_policy(value: Option<String>) -> Option<ReminderPolicy> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }
    match value.parse() {
        Ok(policy) => Some(policy),
        Err(e) => {
            warn!("Ignoring reminder policy: {}", e);
            None
        }
    }
}

impl SubjectMongo {
    fn into_domain(self, kind: SubjectKind, offset_minutes: i32) -> Subject {
        let tenant_id = match self.tenant_id {
            Some(Bson::String(s)) => s,
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            _ => String::new(),
        };
        Subject {
            id: ID::from(self.id),
            tenant_id,
            kind,
            name: self.name,
            title: self.title,
            vendor: self.vendor,
            deadline: bson_to_date(self.deadline, offset_minutes),
            end_date: bson_to_date(self.end_date, offset_minutes),
            reminder_policy: parse_policy(self.reminder_policy),
            reminder_days: bson_to_reminder_days(self.reminder_days),
        }
    }
}

impl MongoDocument<Subject> for SubjectMongo {
    fn from_domain(subject: &Subject) -> Self {
        Self {
            id: subject.id.inner_ref().clone(),
            tenant_id: Some(Bson::String(subject.tenant_id.clone())),
            name: subject.name.clone(),
            title: subject.title.clone(),
            vendor: subject.vendor.clone(),
            deadline: subject.deadline.map(|d| Bson::String(d.to_string())),
            end_date: subject.end_date.map(|d| Bson::String(d.to_string())),
            reminder_policy: subject.reminder_policy.map(|p| p.to_string()),
            reminder_days: subject.reminder_days.clone().map(Bson::String),
        }
    }
}
