//! Ingest-time conversions for values read from the relational store.
//!
//! Time-of-day columns do not always arrive as `HH:MM:SS`: some drivers and
//! views hand them over as an elapsed duration since midnight, either as a
//! number of seconds or as an interval string whose hour part may reach past
//! 24. Everything is normalized here so the slot generator only ever sees a
//! valid [`NaiveTime`].

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

const SECONDS_PER_DAY: i64 = 86_400;

/// Used when a stored time cannot be read as a time of day.
pub const FALLBACK_TIME: NaiveTime = NaiveTime::MIN;

/// Raw shape of a stored time-of-day value.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredTime {
    Seconds(i64),
    FractionalSeconds(f64),
    Text(String),
    Unrecognized(String),
}

impl StoredTime {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(seconds) => StoredTime::Seconds(seconds),
                None => StoredTime::FractionalSeconds(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => StoredTime::Text(s.clone()),
            other => StoredTime::Unrecognized(other.to_string()),
        }
    }

    /// Strict conversion, `None` when the value is not a time of day.
    pub fn to_time(&self) -> Option<NaiveTime> {
        match self {
            StoredTime::Seconds(seconds) => elapsed_to_time(*seconds, 0),
            StoredTime::FractionalSeconds(seconds) if seconds.is_finite() && *seconds >= 0.0 => {
                let whole = seconds.trunc();
                let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
                elapsed_to_time(whole as i64, nanos)
            }
            StoredTime::FractionalSeconds(_) => None,
            StoredTime::Text(text) => parse_clock_text(text),
            StoredTime::Unrecognized(_) => None,
        }
    }

    /// Lenient conversion: invalid values log a warning and become [`FALLBACK_TIME`].
    pub fn normalize(&self) -> NaiveTime {
        self.to_time().unwrap_or_else(|| {
            warn!("Stored time {:?} is not a valid time of day, falling back to {}", self, FALLBACK_TIME);
            FALLBACK_TIME
        })
    }
}

fn elapsed_to_time(total_seconds: i64, nanos: u32) -> Option<NaiveTime> {
    if !(0..SECONDS_PER_DAY).contains(&total_seconds) {
        return None;
    }
    NaiveTime::from_num_seconds_from_midnight_opt(total_seconds as u32, nanos)
}

/// `H:MM[:SS[.fraction]]`, where the hour part counts elapsed hours.
fn parse_clock_text(text: &str) -> Option<NaiveTime> {
    let mut parts = text.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let (seconds, nanos) = match parts.next() {
        Some(raw) => split_seconds(raw)?,
        None => (0, 0),
    };

    if parts.next().is_some()
        || hours < 0
        || !(0..60).contains(&minutes)
        || !(0..60).contains(&seconds)
    {
        return None;
    }

    elapsed_to_time(hours * 3600 + minutes * 60 + seconds, nanos)
}

fn split_seconds(raw: &str) -> Option<(i64, u32)> {
    match raw.split_once('.') {
        None => Some((raw.parse().ok()?, 0)),
        Some((whole, fraction)) => {
            if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let nanos: u32 = format!("{:0<9}", fraction).parse().ok()?;
            Some((whole.parse().ok()?, nanos))
        }
    }
}

pub fn fallback_time() -> NaiveTime {
    FALLBACK_TIME
}

/// Serde hook for time-of-day columns; never fails.
pub fn deserialize_wall_clock<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(StoredTime::from_value(&raw).normalize())
}

/// Parses a stored timestamp as local wall-clock time.
///
/// Offsets, when present, are dropped without conversion: the stored wall
/// clock is what the slot keys are built from.
pub fn parse_wall_clock_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_local()))
        .or_else(|| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z").ok().map(|dt| dt.naive_local()))
}

/// Serde hook for timestamp columns. Unlike times of day these are not
/// recovered: a reservation whose instant cannot be read must not be
/// silently treated as free.
pub fn deserialize_lenient_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_wall_clock_datetime(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
}

/// Room numbers are text in some schemas and integers in others.
pub fn deserialize_room_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid room number {}", other))),
    }
}
