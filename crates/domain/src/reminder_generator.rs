use crate::{date::CalendarDate, reminder::ReminderPolicy};

/// Coerces user provided `reminderDays` into a day count.
///
/// Blank, non numeric and negative values resolve to `default`. Fractional
/// values are truncated.
pub fn coerce_reminder_days(raw: Option<&str>, default: u32) -> u32 {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return default,
    };

    if let Ok(days) = raw.parse::<i64>() {
        return if days < 0 || days > i64::from(u32::MAX) {
            default
        } else {
            days as u32
        };
    }

    match raw.parse::<f64>() {
        Ok(days) if days.is_finite() && days >= 0.0 && days <= f64::from(u32::MAX) => {
            days.trunc() as u32
        }
        _ => default,
    }
}

/// Computes the ordered trigger dates of a reminder policy.
///
/// Every returned date is `>= today` and the dates are strictly increasing.
pub fn generate_trigger_dates(
    deadline: CalendarDate,
    policy: ReminderPolicy,
    reminder_days: u32,
    today: CalendarDate,
) -> Vec<CalendarDate> {
    match policy {
        ReminderPolicy::OneTime => {
            let candidate = deadline.subtract_days(reminder_days);
            if candidate >= today {
                vec![candidate]
            } else {
                vec![]
            }
        }
        ReminderPolicy::TwoTimes => {
            let first = deadline.subtract_days(reminder_days);
            let second = deadline.subtract_days(reminder_days / 2);

            let mut dates = Vec::with_capacity(2);
            if first >= today {
                dates.push(first);
            }
            if second >= today && second > first {
                dates.push(second);
            }
            dates
        }
        ReminderPolicy::UntilRenewal => {
            let start = std::cmp::max(deadline.subtract_days(reminder_days), today);

            let mut dates = Vec::new();
            let mut day = Some(start);
            while let Some(d) = day {
                if d > deadline {
                    break;
                }
                dates.push(d);
                day = d.succ();
            }
            dates
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    fn dates(dates: &[&str]) -> Vec<CalendarDate> {
        dates.iter().map(|d| date(d)).collect()
    }

    #[test]
    fn one_time() {
        let deadline = date("2025-03-10");
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::OneTime, 7, date("2025-03-01")),
            dates(&["2025-03-03"])
        );
        // Trigger date on today is still generated
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::OneTime, 7, date("2025-03-03")),
            dates(&["2025-03-03"])
        );
        assert!(
            generate_trigger_dates(deadline, ReminderPolicy::OneTime, 7, date("2025-03-05"))
                .is_empty()
        );
    }

    #[test]
    fn two_times() {
        let deadline = date("2025-03-10");
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::TwoTimes, 8, date("2025-02-01")),
            dates(&["2025-03-02", "2025-03-06"])
        );
        // First one already passed
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::TwoTimes, 8, date("2025-03-04")),
            dates(&["2025-03-06"])
        );
        // Both passed
        assert!(
            generate_trigger_dates(deadline, ReminderPolicy::TwoTimes, 8, date("2025-03-07"))
                .is_empty()
        );
    }

    #[test]
    fn two_times_never_duplicates() {
        let deadline = date("2025-03-10");
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::TwoTimes, 0, date("2025-02-01")),
            dates(&["2025-03-10"])
        );
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::TwoTimes, 1, date("2025-02-01")),
            dates(&["2025-03-09", "2025-03-10"])
        );
    }

    #[test]
    fn until_renewal() {
        assert_eq!(
            generate_trigger_dates(
                date("2025-03-05"),
                ReminderPolicy::UntilRenewal,
                3,
                date("2025-03-01")
            ),
            dates(&["2025-03-02", "2025-03-03", "2025-03-04", "2025-03-05"])
        );
        // Window starts today when the computed start has passed
        assert_eq!(
            generate_trigger_dates(
                date("2025-03-05"),
                ReminderPolicy::UntilRenewal,
                10,
                date("2025-03-04")
            ),
            dates(&["2025-03-04", "2025-03-05"])
        );
        // Inverted window
        assert!(generate_trigger_dates(
            date("2025-03-05"),
            ReminderPolicy::UntilRenewal,
            3,
            date("2025-03-06")
        )
        .is_empty());
    }

    #[test]
    fn huge_reminder_days_do_not_overflow() {
        let deadline = date("2025-03-10");
        let today = date("2025-03-08");
        assert!(
            generate_trigger_dates(deadline, ReminderPolicy::OneTime, u32::MAX, today).is_empty()
        );
        assert_eq!(
            generate_trigger_dates(deadline, ReminderPolicy::UntilRenewal, u32::MAX, today).len(),
            3
        );
    }

    #[test]
    fn coerces_reminder_days() {
        assert_eq!(coerce_reminder_days(Some("7"), 3), 7);
        assert_eq!(coerce_reminder_days(Some(" 14 "), 3), 14);
        assert_eq!(coerce_reminder_days(Some("0"), 3), 0);
        assert_eq!(coerce_reminder_days(Some("7.9"), 3), 7);
        assert_eq!(coerce_reminder_days(Some("-1"), 3), 3);
        assert_eq!(coerce_reminder_days(Some("seven"), 3), 3);
        assert_eq!(coerce_reminder_days(Some(""), 3), 3);
        assert_eq!(coerce_reminder_days(Some("NaN"), 3), 3);
        assert_eq!(coerce_reminder_days(None, 3), 3);
    }
}
