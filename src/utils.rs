use crate::error::{ReportError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Placeholder rendered for absent cells and for the date of undated rows.
pub const SENTINEL: &str = "-";

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical row key of every table: a calendar day or the undated marker.
///
/// `Day` sorts before `Undated`, so synthetic undated rows always land after
/// the dated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateKey {
    Day(NaiveDate),
    Undated,
}

impl DateKey {
    pub fn is_dated(&self) -> bool {
        matches!(self, DateKey::Day(_))
    }

    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            DateKey::Day(date) => Some(*date),
            DateKey::Undated => None,
        }
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateKey::Day(date) => write!(f, "{}", date.format(DATE_KEY_FORMAT)),
            DateKey::Undated => f.write_str(SENTINEL),
        }
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A raw record carrying a validity marker and a timestamp to format.
pub trait DatedRecord {
    /// Name of the source field, used in error messages.
    const SOURCE_FIELD: &'static str;

    fn date_marker(&self) -> Option<&str>;

    fn date_source(&self) -> Option<&str>;

    fn date_key(&self) -> Result<DateKey> {
        date_key(self.date_marker(), self.date_source(), Self::SOURCE_FIELD)
    }
}

/// Derives the date key of one observation.
///
/// A null (or empty) marker yields [`DateKey::Undated`]. Otherwise the source
/// timestamp is truncated to its UTC calendar day; an unparseable or missing
/// source is an error rather than a corrupted key.
pub fn date_key(marker: Option<&str>, source: Option<&str>, field: &str) -> Result<DateKey> {
    let has_marker = marker.map(|m| !m.trim().is_empty()).unwrap_or(false);
    if !has_marker {
        return Ok(DateKey::Undated);
    }

    let raw = source.ok_or_else(|| ReportError::DateFormat {
        field: field.to_string(),
        value: "null".to_string(),
    })?;

    parse_timestamp(raw, field).map(DateKey::Day)
}

/// Parses an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamp
/// or a bare `YYYY-MM-DD` date into a UTC calendar day.
pub fn parse_timestamp(raw: &str, field: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.date());
        }
    }

    NaiveDate::parse_from_str(trimmed, DATE_KEY_FORMAT).map_err(|_| ReportError::DateFormat {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Sum of the numeric values, or `None` when there are none.
pub fn sum_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}
