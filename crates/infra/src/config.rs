use obligations_domain::ReminderPolicy;
use std::{fmt::Display, str::FromStr};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// Fixed offset in minutes from UTC used to compute the business day.
    /// Trigger dates are compared against the calendar date at this offset.
    pub business_utc_offset_minutes: i32,
    /// A claimed reminder which has not been resolved within this many millis
    /// is considered abandoned and can be claimed again.
    pub reminder_stale_after_millis: i64,
    /// Number of claims after which a failing reminder is given up on.
    /// `None` retries forever.
    pub reminder_max_attempts: Option<u32>,
    /// How often the in-process job scheduler runs a dispatch pass
    pub reminder_dispatch_interval_millis: i64,
    /// `reminderDays` used when a subject has no valid value
    pub default_reminder_days: DefaultReminderDays,
    /// Where notifications are delivered. Notifications are only logged when absent.
    pub notification_webhook: Option<NotificationWebhookConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultReminderDays {
    pub one_time: u32,
    pub two_times: u32,
    pub until_renewal: u32,
}

impl DefaultReminderDays {
    pub fn for_policy(&self, policy: ReminderPolicy) -> u32 {
        match policy {
            ReminderPolicy::OneTime => self.one_time,
            ReminderPolicy::TwoTimes => self.two_times,
            ReminderPolicy::UntilRenewal => self.until_renewal,
        }
    }
}

impl Default for DefaultReminderDays {
    fn default() -> Self {
        Self {
            one_time: 7,
            two_times: 14,
            until_renewal: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationWebhookConfig {
    pub url: String,
    /// Sent in the `obligations-webhook-key` header so that the receiver can
    /// verify the origin of the request
    pub key: String,
}

const MINUTE_MILLIS: i64 = 1000 * 60;

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(name) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default value: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn notification_webhook_from_env() -> Option<NotificationWebhookConfig> {
    let url = std::env::var("NOTIFICATION_WEBHOOK_URL").ok()?;
    match url::Url::parse(&url) {
        Ok(parsed_url) if ["https", "http"].contains(&parsed_url.scheme()) => {
            Some(NotificationWebhookConfig {
                url,
                key: std::env::var("NOTIFICATION_WEBHOOK_KEY").unwrap_or_default(),
            })
        }
        _ => {
            warn!(
                "The given NOTIFICATION_WEBHOOK_URL: {} is not a valid http(s) url, notifications will only be logged.",
                url
            );
            None
        }
    }
}

impl Config {
    pub fn new() -> Self {
        let default = Self::default();

        let mut business_utc_offset_minutes = env_or(
            "BUSINESS_UTC_OFFSET_MINUTES",
            default.business_utc_offset_minutes,
        );
        if business_utc_offset_minutes.abs() >= 24 * 60 {
            warn!(
                "The given BUSINESS_UTC_OFFSET_MINUTES: {} is more than a day, falling back to the default value: {}.",
                business_utc_offset_minutes, default.business_utc_offset_minutes
            );
            business_utc_offset_minutes = default.business_utc_offset_minutes;
        }

        let stale_after_minutes = env_or("REMINDER_STALE_AFTER_MINUTES", 15u32);
        let dispatch_interval_minutes =
            std::cmp::max(env_or("REMINDER_DISPATCH_INTERVAL_MINUTES", 60u32), 1);
        let reminder_max_attempts = match env_or("REMINDER_MAX_ATTEMPTS", 10u32) {
            0 => {
                info!("REMINDER_MAX_ATTEMPTS is 0, failing reminders will be retried forever.");
                None
            }
            max => Some(max),
        };

        let default_reminder_days = DefaultReminderDays {
            one_time: env_or(
                "REMINDER_DEFAULT_DAYS_ONE_TIME",
                default.default_reminder_days.one_time,
            ),
            two_times: env_or(
                "REMINDER_DEFAULT_DAYS_TWO_TIMES",
                default.default_reminder_days.two_times,
            ),
            until_renewal: env_or(
                "REMINDER_DEFAULT_DAYS_UNTIL_RENEWAL",
                default.default_reminder_days.until_renewal,
            ),
        };

        Self {
            port: env_or("PORT", default.port),
            business_utc_offset_minutes,
            reminder_stale_after_millis: i64::from(stale_after_minutes) * MINUTE_MILLIS,
            reminder_max_attempts,
            reminder_dispatch_interval_millis: i64::from(dispatch_interval_minutes)
                * MINUTE_MILLIS,
            default_reminder_days,
            notification_webhook: notification_webhook_from_env(),
        }
    }
}

impl Default for Config {
    /// Defaults without reading the environment
    fn default() -> Self {
        Self {
            port: 5000,
            business_utc_offset_minutes: 330, // IST
            reminder_stale_after_millis: 15 * MINUTE_MILLIS,
            reminder_max_attempts: Some(10),
            reminder_dispatch_interval_millis: 60 * MINUTE_MILLIS,
            default_reminder_days: Default::default(),
            notification_webhook: None,
        }
    }
}
