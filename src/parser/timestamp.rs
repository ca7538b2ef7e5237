// Timestamp reconciliation for user rating files.
// The primary files spread the date over six columns; the `-timestamps`
// siblings carry epoch milliseconds. Both must land on the same wall clock,
// so epoch values are rendered in one fixed offset.

use crate::error::RecordError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

/// Offset applied to epoch values when no other is configured (UTC+1).
pub const DEFAULT_EPOCH_OFFSET_SECS: i32 = 3600;

/// First field holding date/time data in a user record.
pub const TIMESTAMP_FIELD: usize = 3;

/// Format used when a timestamp is written out as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a user record encodes its date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    /// Fields 3..=8: day, month, year, hour, minute, second.
    SplitFields,
    /// Field 3: milliseconds since the Unix epoch.
    EpochMillis,
}

/// Builds timestamps for user records; epoch values render in `offset`.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    offset: FixedOffset,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_EPOCH_OFFSET_SECS)
                .expect("UTC+1 is a valid offset"),
        }
    }
}

impl Reconciler {
    /// Reconciler rendering epoch values in `offset`.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Offset epoch values are rendered in.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Produce the record's timestamp according to `mode`.
    pub fn reconcile(
        &self,
        fields: &[&str],
        mode: TimestampMode,
    ) -> Result<NaiveDateTime, RecordError> {
        match mode {
            TimestampMode::SplitFields => split_fields_timestamp(fields),
            TimestampMode::EpochMillis => self.epoch_millis_timestamp(fields),
        }
    }

    fn epoch_millis_timestamp(&self, fields: &[&str]) -> Result<NaiveDateTime, RecordError> {
        let raw = field(fields, TIMESTAMP_FIELD)?;
        let millis: i64 = raw.parse().map_err(|e| malformed(raw, e))?;
        let instant = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| malformed(raw, "outside the supported date range"))?;
        let local = instant.with_timezone(&self.offset).naive_local();
        // Sub-second precision is dropped, as in the text rendering.
        local
            .with_nanosecond(0)
            .ok_or_else(|| malformed(raw, "cannot truncate to seconds"))
    }
}

// Fields 3..=8 hold day, month, year, hour, minute, second in that order.
fn split_fields_timestamp(fields: &[&str]) -> Result<NaiveDateTime, RecordError> {
    let at = |offset: usize| field(fields, TIMESTAMP_FIELD + offset);
    let (day, month, year) = (at(0)?, at(1)?, at(2)?);
    let (hour, minute, second) = (at(3)?, at(4)?, at(5)?);

    let literal = format!("{}-{}-{} {}:{}:{}", year, month, day, hour, minute, second);
    let date = NaiveDate::from_ymd_opt(
        component(year, &literal)?,
        component(month, &literal)?,
        component(day, &literal)?,
    )
    .ok_or_else(|| malformed(&literal, "not a calendar date"))?;
    date.and_hms_opt(
        component(hour, &literal)?,
        component(minute, &literal)?,
        component(second, &literal)?,
    )
    .ok_or_else(|| malformed(&literal, "not a time of day"))
}

fn field<'a>(fields: &[&'a str], index: usize) -> Result<&'a str, RecordError> {
    fields
        .get(index)
        .copied()
        .ok_or(RecordError::IndexOutOfRange {
            index,
            len: fields.len(),
        })
}

fn component<T: std::str::FromStr>(raw: &str, literal: &str) -> Result<T, RecordError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| malformed(literal, e))
}

fn malformed(value: &str, reason: impl std::fmt::Display) -> RecordError {
    RecordError::MalformedTimestamp {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
