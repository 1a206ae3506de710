mod date;
mod notification;
mod reminder;
mod reminder_generator;
mod shared;
mod subject;

pub use date::{CalendarDate, InvalidCalendarDate};
pub use notification::{ReminderMetadata, ReminderNotification};
pub use reminder::{
    DueRemindersQuery, InvalidReminderPolicy, InvalidReminderTarget, ReminderDocument,
    ReminderPolicy, ReminderTarget,
};
pub use reminder_generator::{coerce_reminder_days, generate_trigger_dates};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use subject::{Subject, SubjectKind};
