use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::block::BlockTag;

/// Which of the two blocks adjacent to a timestamp crossing point to return.
/// `After` is inclusive of an exact timestamp hit, `Before` is exclusive, so
/// the two sides never return the same block for the same timestamp.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Closest {
    #[default]
    After,
    Before,
}

serde_plain::derive_display_from_serialize!(Closest);
serde_plain::derive_fromstr_from_deserialize!(Closest);

impl Closest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Closest::After => "after",
            Closest::Before => "before",
        }
    }
}

/// Accepted forms of a query timestamp. Normalization happens before any
/// search begins, so malformed input never reaches the chain.
#[derive(Clone, Debug, PartialEq)]
pub enum DatetimeInput {
    Tag(BlockTag),
    /// Unix epoch milliseconds.
    Millis(i64),
    /// RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` date.
    Iso(String),
    Datetime(DateTime<Utc>),
}

impl From<BlockTag> for DatetimeInput {
    fn from(tag: BlockTag) -> Self {
        DatetimeInput::Tag(tag)
    }
}

impl From<i64> for DatetimeInput {
    fn from(millis: i64) -> Self {
        DatetimeInput::Millis(millis)
    }
}

impl From<&str> for DatetimeInput {
    fn from(datetime: &str) -> Self {
        DatetimeInput::Iso(datetime.to_string())
    }
}

impl From<String> for DatetimeInput {
    fn from(datetime: String) -> Self {
        DatetimeInput::Iso(datetime)
    }
}

impl From<DateTime<Utc>> for DatetimeInput {
    fn from(datetime: DateTime<Utc>) -> Self {
        DatetimeInput::Datetime(datetime)
    }
}

impl DatetimeInput {
    /// Tags carry no fixed instant, they resolve against the chain boundaries
    /// and are handled by the client before this point.
    pub fn to_utc(&self) -> crate::Result<DateTime<Utc>> {
        match self {
            DatetimeInput::Tag(tag) => Err(crate::Error::InvalidDatetime(tag.to_string())),
            DatetimeInput::Millis(millis) => {
                DateTime::from_timestamp_millis(*millis).ok_or(crate::Error::DatetimeOutOfRange)
            }
            DatetimeInput::Iso(datetime) => parse_iso(datetime),
            DatetimeInput::Datetime(datetime) => Ok(*datetime),
        }
    }
}

fn parse_iso(datetime: &str) -> crate::Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(datetime) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(datetime, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(datetime, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(crate::Error::InvalidDatetime(datetime.to_string()))
}

/// Calendar unit for stepping through a range.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

serde_plain::derive_display_from_serialize!(Interval);
serde_plain::derive_fromstr_from_deserialize!(Interval);

impl Interval {
    /// Step `from` forward by `by` units. Month and year steps are calendar
    /// correct (a Jan 31 start clamps to the end of February).
    pub fn advance(&self, from: DateTime<Utc>, by: u32) -> crate::Result<DateTime<Utc>> {
        let stepped = match self {
            Interval::Seconds => from.checked_add_signed(TimeDelta::seconds(by as i64)),
            Interval::Minutes => from.checked_add_signed(TimeDelta::minutes(by as i64)),
            Interval::Hours => from.checked_add_signed(TimeDelta::hours(by as i64)),
            Interval::Days => from.checked_add_signed(TimeDelta::days(by as i64)),
            Interval::Weeks => from.checked_add_signed(TimeDelta::weeks(by as i64)),
            Interval::Months => from.checked_add_months(Months::new(by)),
            Interval::Years => from.checked_add_months(Months::new(by.saturating_mul(12))),
        };
        stepped.ok_or(crate::Error::DatetimeOutOfRange)
    }
}

/// Options for a single timestamp resolution.
#[derive(Clone, Debug)]
pub struct BlockQuery {
    pub timestamp: DatetimeInput,
    pub closest: Closest,
    /// Seed seconds-per-block estimate. Defaults to the session's average
    /// block time since genesis.
    pub block_time: Option<f64>,
    /// Defaults to true iff an explorer client is configured.
    pub use_block_explorer: Option<bool>,
    pub include_full_block: bool,
}

impl BlockQuery {
    pub fn new(timestamp: impl Into<DatetimeInput>) -> Self {
        Self {
            timestamp: timestamp.into(),
            closest: Closest::default(),
            block_time: None,
            use_block_explorer: None,
            include_full_block: false,
        }
    }

    pub fn closest(mut self, closest: Closest) -> Self {
        self.closest = closest;
        self
    }

    pub fn block_time(mut self, seconds_per_block: f64) -> Self {
        self.block_time = Some(seconds_per_block);
        self
    }

    pub fn use_block_explorer(mut self, enabled: bool) -> Self {
        self.use_block_explorer = Some(enabled);
        self
    }

    pub fn include_full_block(mut self, include: bool) -> Self {
        self.include_full_block = include;
        self
    }
}

/// Options for resolving a series of timestamps between `start` and `end`.
#[derive(Clone, Debug)]
pub struct RangeQuery {
    pub start: DatetimeInput,
    /// Defaults to now.
    pub end: Option<DatetimeInput>,
    pub interval: Interval,
    /// Step multiplier, e.g. interval = Months, duration = 3 for quarterly.
    pub duration: u32,
    pub closest: Closest,
    pub include_full_block: bool,
}

impl RangeQuery {
    pub fn new(start: impl Into<DatetimeInput>, interval: Interval) -> Self {
        Self {
            start: start.into(),
            end: None,
            interval,
            duration: 1,
            closest: Closest::default(),
            include_full_block: false,
        }
    }

    pub fn end(mut self, end: impl Into<DatetimeInput>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn closest(mut self, closest: Closest) -> Self {
        self.closest = closest;
        self
    }

    pub fn include_full_block(mut self, include: bool) -> Self {
        self.include_full_block = include;
        self
    }
}
