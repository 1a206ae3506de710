use crate::{
    date::CalendarDate,
    reminder::ReminderPolicy,
    shared::entity::{Entity, ID},
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The kind of obligation a `Subject` represents. Each kind has its own
/// collections and its own name for the reference field on reminder documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Subscription,
    Compliance,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 2] = [SubjectKind::Subscription, SubjectKind::Compliance];

    /// Name of the field referencing the subject on a reminder document
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Subscription => "subscriptionId",
            Self::Compliance => "complianceId",
        }
    }

    /// The kind of notification sent for reminders of this subject kind
    pub fn notification_kind(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription_reminder",
            Self::Compliance => "compliance_reminder",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Compliance => "compliance",
        }
    }
}

impl Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A subscription or compliance obligation owned by a tenant.
///
/// `Subject`s are created and edited by the surrounding CRUD application, this
/// crate only reads the fields needed to generate and send reminders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: ID,
    pub tenant_id: String,
    pub kind: SubjectKind,
    pub name: Option<String>,
    pub title: Option<String>,
    pub vendor: Option<String>,
    pub deadline: Option<CalendarDate>,
    /// Used as the deadline when `deadline` is absent
    pub end_date: Option<CalendarDate>,
    pub reminder_policy: Option<ReminderPolicy>,
    /// Raw user input, see `coerce_reminder_days`
    pub reminder_days: Option<String>,
}

impl Entity for Subject {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl Subject {
    pub fn new(kind: SubjectKind, tenant_id: String) -> Self {
        Self {
            id: Default::default(),
            tenant_id,
            kind,
            name: None,
            title: None,
            vendor: None,
            deadline: None,
            end_date: None,
            reminder_policy: None,
            reminder_days: None,
        }
    }

    /// First non blank of `name`, `title` and `vendor`
    pub fn display_name(&self) -> String {
        [&self.name, &self.title, &self.vendor]
            .iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("Untitled {}", self.kind))
    }

    /// `deadline` wins over `end_date`
    pub fn resolve_deadline(&self) -> Option<CalendarDate> {
        self.deadline.or(self.end_date)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_name_falls_back() {
        let mut subject = Subject::new(SubjectKind::Compliance, "tenant".into());
        assert_eq!(subject.display_name(), "Untitled compliance");

        subject.vendor = Some("Acme".into());
        assert_eq!(subject.display_name(), "Acme");

        subject.name = Some("   ".into());
        subject.title = Some("ISO 27001 audit".into());
        assert_eq!(subject.display_name(), "ISO 27001 audit");

        subject.name = Some("SOC2".into());
        assert_eq!(subject.display_name(), "SOC2");
    }

    #[test]
    fn deadline_wins_over_end_date() {
        let mut subject = Subject::new(SubjectKind::Subscription, "tenant".into());
        assert_eq!(subject.resolve_deadline(), None);

        let end_date = "2025-04-01".parse().unwrap();
        subject.end_date = Some(end_date);
        assert_eq!(subject.resolve_deadline(), Some(end_date));

        let deadline = "2025-03-10".parse().unwrap();
        subject.deadline = Some(deadline);
        assert_eq!(subject.resolve_deadline(), Some(deadline));
    }
}
