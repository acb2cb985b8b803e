//! Timestamp handling for insight reports.
//!
//! Reports express every instant as a time of day (`H:MM:SS` or `H:MM:SS.fff`).
//! The [`Tokenizer`] turns those into millisecond offsets and maps spans of
//! time onto the fixed-width buckets a video is cut into.

use chrono::{NaiveTime, TimeDelta};

use crate::{
    config::IntervalConfig,
    error::{ClipdexError, Result},
};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const MAX_FRACTION_DIGITS: usize = 9;

/// Parse a report timestamp into the time elapsed since midnight.
pub fn parse_timestamp(text: &str) -> Result<TimeDelta> {
    let time = parse_clock(text).ok_or_else(|| ClipdexError::InvalidTimestamp {
        text: text.to_string(),
    })?;
    Ok(time.signed_duration_since(NaiveTime::MIN))
}

/// Parse a report timestamp into milliseconds, keeping sub-millisecond precision.
pub fn parse_millis(text: &str) -> Result<f64> {
    let elapsed = parse_timestamp(text)?;
    Ok(elapsed.num_seconds() as f64 * 1000.0 + elapsed.subsec_nanos() as f64 / 1_000_000.0)
}

/// Parse a report timestamp into whole milliseconds (fraction truncated).
pub fn parse_whole_millis(text: &str) -> Result<u64> {
    let elapsed = parse_timestamp(text)?;
    Ok(elapsed.num_milliseconds().max(0) as u64)
}

/// Format elapsed seconds as a `HH:MM:SS` clock reading.
pub fn format_seconds(seconds: f64) -> String {
    let secs = (seconds.trunc() as i64).rem_euclid(SECONDS_PER_DAY);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// Format a millisecond offset as a `HH:MM:SS` clock reading.
pub fn format_millis(millis: u64) -> String {
    format_seconds(millis as f64 / 1000.0)
}

/// Bucket offsets touched by the span `[start_ms, end_ms)`.
///
/// Every bucket boundary inside the span is returned in ascending order. A span
/// that crosses no boundary belongs to the bucket containing its start. A span
/// that starts mid-bucket and crosses a boundary is not attributed to the
/// bucket holding its start.
///
/// Panics if `width_ms` is zero.
pub fn related_buckets(start_ms: u64, end_ms: u64, width_ms: u64) -> Vec<u64> {
    let first_boundary = start_ms.div_ceil(width_ms) * width_ms;
    let boundaries: Vec<u64> = (first_boundary..end_ms)
        .step_by(width_ms as usize)
        .collect();

    if boundaries.is_empty() {
        vec![start_ms - start_ms % width_ms]
    } else {
        boundaries
    }
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };

    let mut fields = clock.split(':');
    let (hours, minutes, seconds) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }
    if !(1..=2).contains(&hours.len()) || minutes.len() != 2 || seconds.len() != 2 {
        return None;
    }

    let hours = parse_digits(hours)?;
    let minutes = parse_digits(minutes)?;
    let seconds = parse_digits(seconds)?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let nanos = match fraction {
        None => 0,
        Some(digits) if digits.is_empty() || digits.len() > MAX_FRACTION_DIGITS => return None,
        Some(digits) => parse_digits(digits)? * 10u32.pow((MAX_FRACTION_DIGITS - digits.len()) as u32),
    };

    NaiveTime::from_hms_nano_opt(hours, minutes, seconds, nanos)
}

fn parse_digits(text: &str) -> Option<u32> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

/// Maps report timestamps onto the buckets of one interval width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    width_ms: u64,
}

impl Tokenizer {
    pub fn new(config: IntervalConfig) -> Self {
        Self {
            width_ms: config.width_ms(),
        }
    }

    pub fn with_width(width_ms: u64) -> Result<Self> {
        IntervalConfig::new(width_ms).map(Self::new)
    }

    pub fn width_ms(&self) -> u64 {
        self.width_ms
    }

    /// Buckets touched by an instance given as report timestamps.
    pub fn related_buckets(&self, start: &str, end: &str) -> Result<Vec<u64>> {
        let start_ms = parse_whole_millis(start)?;
        let end_ms = parse_whole_millis(end)?;
        Ok(related_buckets(start_ms, end_ms, self.width_ms))
    }

    /// Start offsets of every bucket covering `[0, duration_ms)`.
    pub fn bucket_offsets(&self, duration_ms: u64) -> impl Iterator<Item = u64> + use<> {
        (0..duration_ms).step_by(self.width_ms as usize)
    }

    pub fn bucket_index(&self, offset_ms: u64) -> u64 {
        offset_ms / self.width_ms
    }
}
