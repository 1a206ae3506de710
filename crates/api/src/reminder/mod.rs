pub mod dispatch_reminders;
pub mod sync_subject_reminders;
