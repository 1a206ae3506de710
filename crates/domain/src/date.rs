use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{de::Visitor, Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar day without any time of day component.
///
/// Trigger dates and deadlines are compared as `CalendarDate`s and never as
/// instants, so that a reminder scheduled for a local day fires on that local
/// day regardless of the UTC offset of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

#[derive(Error, Debug, PartialEq)]
pub enum InvalidCalendarDate {
    #[error("Date: `{0}` is not a valid YYYY-MM-DD date")]
    Malformed(String),
}

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, InvalidCalendarDate> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| InvalidCalendarDate::Malformed(format!("{}-{}-{}", year, month, day)))
    }

    /// The calendar date at `timestamp_millis + offset_minutes`.
    ///
    /// The offset is a fixed configuration value (e.g. +330 for IST), no
    /// timezone database is consulted.
    pub fn at_offset(timestamp_millis: i64, offset_minutes: i32) -> Self {
        let shifted = timestamp_millis.saturating_add(i64::from(offset_minutes) * 60 * 1000);
        match DateTime::<Utc>::from_timestamp_millis(shifted) {
            Some(dt) => Self(dt.date_naive()),
            None if shifted < 0 => Self(NaiveDate::MIN),
            None => Self(NaiveDate::MAX),
        }
    }

    /// Saturates at the latest representable date
    pub fn add_days(&self, days: u32) -> Self {
        Self(
            self.0
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    /// Saturates at the earliest representable date
    pub fn subtract_days(&self, days: u32) -> Self {
        Self(
            self.0
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
        )
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn format(&self) -> String {
        self.0.format(DATE_FORMAT).to_string()
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl FromStr for CalendarDate {
    type Err = InvalidCalendarDate;

    /// Accepts `YYYY-MM-DD`. A trailing time component as written by
    /// javascript clients (`2025-03-10T00:00:00.000Z`) is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let date_part = s.split('T').next().unwrap_or(s);
        let parts = date_part.split('-').collect::<Vec<_>>();
        if parts.len() != 3 || parts[0].len() != 4 || parts[1].len() != 2 || parts[2].len() != 2 {
            return Err(InvalidCalendarDate::Malformed(s.to_string()));
        }

        NaiveDate::parse_from_str(date_part, DATE_FORMAT)
            .map(Self)
            .map_err(|_| InvalidCalendarDate::Malformed(s.to_string()))
    }
}

impl Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct CalendarDateVisitor;

        impl<'de> Visitor<'de> for CalendarDateVisitor {
            type Value = CalendarDate;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("A YYYY-MM-DD date")
            }

            fn visit_str<E>(self, value: &str) -> Result<CalendarDate, E>
            where
                E: serde::de::Error,
            {
                value.parse::<CalendarDate>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(CalendarDateVisitor)
    }
}
