use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc,
};

use crate::models::{Interval, ShopHours};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Working-hours window of `date`, in shop-local time.
pub fn day_window(hours: &ShopHours, date: NaiveDate) -> Interval {
    Interval::new(date.and_time(hours.open), date.and_time(hours.close))
}

/// A date is closed on a configured weekday or when it is already in the past.
pub fn is_closed(hours: &ShopHours, date: NaiveDate, today: NaiveDate) -> bool {
    hours.is_closed_day(date.weekday()) || date < today
}

pub fn now_local(hours: &ShopHours) -> NaiveDateTime {
    Utc::now().with_timezone(&hours.utc_offset).naive_local()
}

pub fn today(hours: &ShopHours) -> NaiveDate {
    now_local(hours).date()
}

/// ISO-8601 with the shop offset, e.g. `2030-06-17T10:00:00+03:00`.
pub fn to_wire(hours: &ShopHours, dt: &NaiveDateTime) -> String {
    local_to_fixed(dt, hours.utc_offset).to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parses a wire timestamp into shop-local time. Timestamps carrying an
/// offset are converted; naive ones are taken as already shop-local.
pub fn parse_wire(hours: &ShopHours, s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&hours.utc_offset).naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn local_to_fixed(dt: &NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = *dt - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}
