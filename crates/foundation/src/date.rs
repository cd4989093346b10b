//! Calendar date primitives.
//!
//! Imagery is addressed by whole UTC days, so everything above this crate
//! works in `chrono::NaiveDate` and asks a [`Clock`] for "today" instead of
//! reading the system time directly. That keeps clamping and fail-soft
//! defaults reproducible under test.

use std::fmt;

use chrono::{Days, NaiveDate, Utc};

/// Wire format for dates in URLs, templates and label snapshots.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Source of the current calendar day.
pub trait Clock: fmt::Debug + Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// UTC wall clock.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one day.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}

/// Future dates collapse onto `today`; past dates pass through.
pub fn clamp_to_today(date: NaiveDate, today: NaiveDate) -> NaiveDate {
    date.min(today)
}

/// `date + days`, or `None` past the end of the representable calendar.
pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

/// `date - days`, saturating at the start of the representable calendar.
pub fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}
