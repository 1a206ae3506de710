use crate::{
    date::CalendarDate,
    shared::entity::{Entity, ID},
    subject::{Subject, SubjectKind},
};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Display, str::FromStr};
use thiserror::Error;

/// The rule used to derive the trigger dates of a `Subject`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReminderPolicy {
    /// A single reminder `reminderDays` before the deadline
    OneTime,
    /// A reminder `reminderDays` before the deadline and another one
    /// half way between that day and the deadline
    TwoTimes,
    /// A reminder every day from `reminderDays` before the deadline
    /// up to and including the deadline
    UntilRenewal,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidReminderPolicy {
    #[error("Reminder policy: `{0}` is not recognized")]
    Unknown(String),
}

impl ReminderPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "One time",
            Self::TwoTimes => "Two times",
            Self::UntilRenewal => "Until Renewal",
        }
    }

    /// Label persisted as `reminderType` on the generated documents
    pub fn reminder_type(&self) -> &'static str {
        match self {
            Self::OneTime => "One time reminder",
            Self::TwoTimes => "Two times reminder",
            Self::UntilRenewal => "Until renewal reminder",
        }
    }
}

impl Display for ReminderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReminderPolicy {
    type Err = InvalidReminderPolicy;

    /// Case and whitespace insensitive, so `"one time"`, `"One Time"` and
    /// `"OneTime"` are all accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "onetime" => Ok(Self::OneTime),
            "twotimes" => Ok(Self::TwoTimes),
            "untilrenewal" => Ok(Self::UntilRenewal),
            _ => Err(InvalidReminderPolicy::Unknown(s.to_string())),
        }
    }
}

impl TryFrom<String> for ReminderPolicy {
    type Error = InvalidReminderPolicy;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReminderPolicy> for String {
    fn from(policy: ReminderPolicy) -> Self {
        policy.as_str().to_string()
    }
}

/// A persisted reminder for a `Subject`, which becomes due at `trigger_date`.
///
/// The references to the tenant and the subject are kept exactly as they were
/// stored. They are validated with `ReminderDocument::target` after the document
/// has been claimed, so that malformed references can be terminated instead of
/// being retried forever.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderDocument {
    pub id: ID,
    pub tenant_id: String,
    pub subject_kind: SubjectKind,
    pub subject_id: Option<String>,
    pub policy: ReminderPolicy,
    pub reminder_type: String,
    pub trigger_date: CalendarDate,
    /// Terminal flag. A sent document is never claimed again
    pub sent: bool,
    /// Timestamp in millis of the current claim, if any
    pub processing_at: Option<i64>,
    /// Incremented on every successful claim
    pub attempt_count: u32,
    /// Reason of the last retryable failure
    pub last_error: Option<String>,
    /// Reason of the terminal failure
    pub sent_error: Option<String>,
    pub sent_at: Option<i64>,
    pub created_at: i64,
}

impl Entity for ReminderDocument {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl ReminderDocument {
    pub fn new(
        subject: &Subject,
        policy: ReminderPolicy,
        trigger_date: CalendarDate,
        created_at: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            tenant_id: subject.tenant_id.clone(),
            subject_kind: subject.kind,
            subject_id: Some(subject.id.as_string()),
            policy,
            reminder_type: policy.reminder_type().to_string(),
            trigger_date,
            sent: false,
            processing_at: None,
            attempt_count: 0,
            last_error: None,
            sent_error: None,
            sent_at: None,
            created_at,
        }
    }

    /// Validates the stored references of this document
    pub fn target(&self) -> Result<ReminderTarget, InvalidReminderTarget> {
        let tenant_id = self.tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(InvalidReminderTarget::MissingTenant);
        }
        let subject_id = match &self.subject_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(InvalidReminderTarget::MissingSubject(self.subject_kind)),
        };
        let subject_id = subject_id
            .parse::<ID>()
            .map_err(|_| {
                InvalidReminderTarget::MalformedSubject(self.subject_kind, subject_id.clone())
            })?;

        Ok(ReminderTarget {
            tenant_id: tenant_id.to_string(),
            subject_id,
        })
    }
}

/// The validated references of a `ReminderDocument`
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderTarget {
    pub tenant_id: String,
    pub subject_id: ID,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidReminderTarget {
    #[error("Reminder has no tenantId")]
    MissingTenant,
    #[error("Reminder has no {}", .0.id_field())]
    MissingSubject(SubjectKind),
    #[error("Reminder references a malformed {}: `{}`", .0.id_field(), .1)]
    MalformedSubject(SubjectKind, String),
}

/// The claimability predicate for `ReminderDocument`s.
///
/// A document is claimable iff it is not sent, its trigger date is not after
/// `today` and it is either unclaimed or its claim was made before `stale_before`.
#[derive(Debug, Clone, PartialEq)]
pub struct DueRemindersQuery {
    pub today: CalendarDate,
    /// Claims made before this timestamp in millis are considered abandoned
    pub stale_before: i64,
    pub tenant_id: Option<String>,
}

impl DueRemindersQuery {
    pub fn matches(&self, reminder: &ReminderDocument) -> bool {
        if reminder.sent || reminder.trigger_date > self.today {
            return false;
        }
        if let Some(tenant_id) = &self.tenant_id {
            if &reminder.tenant_id != tenant_id {
                return false;
            }
        }
        match reminder.processing_at {
            None => true,
            Some(claimed_at) => claimed_at < self.stale_before,
        }
    }
}
